// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod errors;
pub mod ledgers;
pub mod network;
pub mod registry;
pub mod server;
pub mod store;
pub mod telemetry;
