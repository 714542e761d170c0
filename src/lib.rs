#![allow(dead_code)]

#[macro_use]
extern crate lazy_static;

pub mod actor;
pub mod boxes;
pub mod costume;
pub mod interpreter;
pub mod opcode_tables;
pub mod ops_v0;
pub mod ops_v2;
pub mod ops_v5;
pub mod ops_v8;
pub mod path;
pub mod room;
pub mod savegame;
pub mod script;
pub mod srand;
pub mod vars;
pub mod version;
pub mod walk;
pub mod walk_v0;


#[cfg(test)]
mod dispatch_tests;
