pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod source;
pub mod pipeline {
    pub mod compose;
    pub mod container;
    pub mod stereo;
}
pub mod render {
    pub mod layers;
    pub mod texture;
    pub mod viewer;
}
pub mod tasks {
    pub mod mesh;
}
