// OpenSoul Gate - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod env;
pub mod paths;
pub mod profile;
pub mod origin;
pub mod config;
pub mod gate;
