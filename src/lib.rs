//! Poster renamer
//!
//! Matches poster artwork against Plex collections and Radarr/Sonarr libraries
//! and places the files under canonical names in a destination directory.

pub mod cli;
pub mod config;
pub mod jobs;
pub mod media;
pub mod services;
