#![doc(html_no_source)]

mod caustics;
pub use caustics::Caustics;

// Reexport all crates
pub use caustics_bake;
pub use caustics_camera;
pub use caustics_geometry;
pub use caustics_placement;
pub use caustics_scene;
pub use caustics_splat;
pub use caustics_texture;
pub use caustics_time;
pub use caustics_transform;
