// Core types and pure logic for the gavel auction client: data model,
// wire codec, bid rules, derived views, configuration and local storage.

pub mod bidding;
pub mod config;
pub mod db;
pub mod directory;
pub mod model;
pub mod protocol;
pub mod views;
