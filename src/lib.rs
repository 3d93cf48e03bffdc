pub mod config;
pub mod events;
pub mod hms;
pub mod overlay;
pub mod settings;
pub mod simulation;
pub mod slideshow;
pub mod store;
pub mod tick;
pub mod timer;
pub mod weather;
pub mod tasks {
    pub mod control;
    pub mod images;
    pub mod overlay;
    pub mod settings_watch;
    pub mod slideshow;
    pub mod timer;
    pub mod weather;
}
