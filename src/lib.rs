//! IPTV Player core
//! Playlist codec, channel catalog and playback session controller

pub mod catalog;
pub mod config;
pub mod error;
pub mod m3u_parser;
pub mod models;
pub mod player;

mod m3u_parser_tests;

pub use error::{Error, Result};
