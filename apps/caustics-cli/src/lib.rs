use std::{path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use caustics::caustics_bake::{
    run_bake, BakeConfig, Collaborators, Device, FlatReceiverRenderer, TargetSelection,
};
use caustics::caustics_placement::{PlanSettings, SensorPlanner};
use caustics::caustics_scene::{SceneContext, SceneDescription};
use caustics::Caustics;
use clap::{Args as ClapArgs, Parser, Subcommand};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(version, about = "Bakes caustic light maps", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the sensors every source light would render with
    Plan {
        /// Scene description in JSON
        scene: PathBuf,

        /// Samples the widest sensor of every light renders
        #[arg(long, default_value_t = 1)]
        samples: u32,

        /// Scale by light energy even when baking a single light
        #[arg(long, default_value_t = false)]
        bake_energy: bool,

        /// Print the sensors as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Bake a caustic map with the flat receiver renderer
    Bake(BakeArgs),
}

#[derive(ClapArgs, Debug)]
struct BakeArgs {
    /// Scene description in JSON
    scene: PathBuf,

    /// Directory the caustic map is written to
    #[arg(long)]
    output: PathBuf,

    /// Existing square image providing the resolution and name of the map
    #[arg(long)]
    target: Option<PathBuf>,

    /// Resolution of a new map
    #[arg(long, default_value_t = 2048)]
    resolution: u32,

    /// File name of a new map, without extension
    #[arg(long, default_value = "cb")]
    image_name: String,

    #[arg(long, default_value_t = 1)]
    samples: u32,

    /// Scales the 1024 pixel sensor renders
    #[arg(long, default_value_t = 1.0)]
    sample_resolution_multiplier: f32,

    /// Render a color pass for every sample
    #[arg(long, default_value_t = false)]
    colored: bool,

    #[arg(long, default_value_t = false)]
    bake_energy: bool,

    /// Ask the renderer for its CPU device
    #[arg(long, default_value_t = false)]
    cpu: bool,
}

impl BakeArgs {
    fn config(&self) -> BakeConfig {
        let target = match &self.target {
            Some(path) => TargetSelection::Existing { path: path.clone() },
            None => TargetSelection::New {
                resolution: self.resolution,
                image_name: self.image_name.clone(),
            },
        };

        BakeConfig {
            target,
            samples: self.samples,
            sample_resolution_multiplier: self.sample_resolution_multiplier,
            colored: self.colored,
            device: if self.cpu { Device::Cpu } else { Device::Gpu },
            bake_energy: self.bake_energy,
            output_dir: Some(self.output.clone()),
            ..Default::default()
        }
    }
}

fn load_scene(path: &PathBuf) -> Result<SceneContext> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene {}", path.display()))?;
    let description: SceneDescription = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scene {}", path.display()))?;

    Ok(description.build()?)
}

fn plan(scene: &SceneContext, samples: u32, bake_energy: bool, json: bool) -> Result<()> {
    let planner = SensorPlanner::new(PlanSettings {
        requested_samples: samples,
        bake_energy,
        light_count: scene.sources().count(),
        ..Default::default()
    });

    for light in scene.sources() {
        let plan = planner
            .plan(light, scene)
            .with_context(|| format!("failed to plan light '{}'", light.name))?;

        if json {
            let sensors: Vec<_> = plan.sensors.iter().map(|planned| &planned.sensor).collect();
            println!("{}", serde_json::to_string_pretty(&sensors)?);
            continue;
        }

        println!(
            "{} ({} sensors, {} samples{})",
            light.name,
            plan.len(),
            plan.total_samples(),
            if plan.full_sphere { ", full sphere" } else { "" }
        );
        for planned in &plan.sensors {
            let sensor = &planned.sensor;
            let lens = sensor.lens();
            let aspect = lens.pixel_aspect();
            let extent = match (lens.ortho_scale(), lens.fov()) {
                (Some(scale), _) => format!("scale {scale:.3}"),
                (None, Some(fov)) => format!("fov {:.1}°", fov.to_degrees()),
                (None, None) => String::new(),
            };
            println!(
                "  {:?} {} aspect {:.3}x{:.3} members {} density {:.4} remaining {} normalization {:.6}",
                sensor.projection(),
                extent,
                aspect.x,
                aspect.y,
                planned.members.len(),
                sensor.sample_density(),
                sensor.remaining(),
                sensor.normalization().unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn bake(args: &BakeArgs) -> Result<()> {
    let scene = load_scene(&args.scene)?;
    let handle = run_bake(
        &args.config(),
        scene,
        Collaborators::new(FlatReceiverRenderer::new()),
    )?;

    let mut last_status = String::new();
    while !handle.is_done() {
        let progress = handle.progress();
        if progress.status != last_status {
            log::info!("{:5.1}% {}", progress.percent, progress.status);
            last_status = progress.status;
        }
        thread::sleep(PROGRESS_INTERVAL);
    }

    let output = handle.join()?;
    match output.path {
        Some(path) => println!("{}", path.display()),
        None => log::warn!("The caustic map was not written"),
    }
    Ok(())
}

pub fn internal_main() -> Result<()> {
    let _caustics = Caustics::new("Caustics CLI");
    let args = Args::parse();

    match args.command {
        Command::Plan {
            scene,
            samples,
            bake_energy,
            json,
        } => plan(&load_scene(&scene)?, samples, bake_energy, json),
        Command::Bake(args) => bake(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "objects": [
            { "name": "pane", "tags": ["Contributor"],
              "bounds": { "min": [-0.5, -0.5, 1.0], "max": [0.5, 0.5, 1.0] } },
            { "name": "floor", "tags": ["Receiver"],
              "bounds": { "min": [-2.0, -2.0, 0.0], "max": [2.0, 2.0, 0.0] } }
        ],
        "lights": [
            { "name": "sun", "kind": "Directional", "direction": [0.0, 0.0, -1.0] }
        ]
    }"#;

    #[test]
    fn bake_arguments_map_onto_config() {
        let args = Args::try_parse_from([
            "caustics-cli",
            "bake",
            "scene.json",
            "--output",
            "out",
            "--samples",
            "8",
            "--colored",
            "--cpu",
        ])
        .unwrap();

        let Command::Bake(bake) = args.command else {
            panic!("expected the bake command");
        };
        let config = bake.config();

        assert_eq!(config.samples, 8);
        assert!(config.colored);
        assert_eq!(config.device, Device::Cpu);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(
            config.target,
            TargetSelection::New {
                resolution: 2048,
                image_name: "cb".to_owned()
            }
        );
    }

    #[test]
    fn existing_target_replaces_new_one() {
        let args = Args::try_parse_from([
            "caustics-cli",
            "bake",
            "scene.json",
            "--output",
            "out",
            "--target",
            "floor.exr",
        ])
        .unwrap();

        let Command::Bake(bake) = args.command else {
            panic!("expected the bake command");
        };
        assert_eq!(
            bake.config().target,
            TargetSelection::Existing {
                path: PathBuf::from("floor.exr")
            }
        );
    }

    #[test]
    fn bake_requires_output() {
        assert!(Args::try_parse_from(["caustics-cli", "bake", "scene.json"]).is_err());
    }

    #[test]
    fn scene_file_plans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, SCENE).unwrap();

        let scene = load_scene(&path).unwrap();

        assert_eq!(scene.sources().count(), 1);
        plan(&scene, 2, false, true).unwrap();
        plan(&scene, 2, false, false).unwrap();
    }

    #[test]
    fn unreadable_scene_names_the_file() {
        let err = load_scene(&PathBuf::from("missing/scene.json")).unwrap_err();

        assert!(err.to_string().contains("missing/scene.json"));
    }
}
