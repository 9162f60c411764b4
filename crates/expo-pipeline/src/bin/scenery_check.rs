use expo_pipeline::{PipelineConfig, SequencePolicy};
use expo_scenery::{RandomPathGenerator, SceneryDocument};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();
    config.validate()?;

    let path = &config.sequence.scenery_path;
    println!("scenery-check: loading {}", path.display());
    let document = SceneryDocument::load(path)?;
    println!(
        "scenery-check: {} nodes, {} tags, start={}",
        document.node_count(),
        document.tags_weights.len(),
        document.starting_node
    );

    if config.sequence.policy == SequencePolicy::StaticPool {
        // Validates the pool against the document.
        config.sequence.build_cursor()?;
        println!(
            "scenery-check: static pool {} ok",
            config.sequence.static_paths_path.display()
        );
    }

    let mut generator = RandomPathGenerator::new(
        &document,
        config.sequence.generator_settings(),
        config.sequence.seed,
    )?;
    let generated = match generator.generate() {
        Ok(generated) => generated,
        Err(e) if e.is_configuration_fault() => {
            anyhow::bail!("scenery document cannot produce a path: {}", e)
        }
        Err(e) => return Err(e.into()),
    };

    println!("scenery-check: attempts={}", generated.attempts);
    println!("scenery-check: sampled tags {:?}", generated.sampled_tags);
    println!("scenery-check: tag groups {:?}", generated.groups);
    println!("scenery-check: path {}", generated.path);
    for node in generated.path.nodes() {
        let tags = document.tags_of(node).unwrap_or_default();
        println!("  {} {:?}", node, tags);
    }

    println!("scenery-check: ok");
    Ok(())
}
