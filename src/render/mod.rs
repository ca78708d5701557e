//! Text rendering for generated files.
//!
//! Rendering is pure: every function maps data to a `String` and never
//! touches the filesystem.

mod adapter;
mod index;
mod writer;

pub use adapter::render_adapter;
pub use index::{PLACEHOLDER_EXPORT, ROOT_INDEX, render_category_index};

/// First lines of every generated file.
pub const GENERATED_HEADER: [&str; 2] = [
    "// This file is automatically generated by restate-gen.",
    "// Do not edit this file directly.",
];
