//! CAZyme annotation pipeline: fetch genome assemblies from NCBI, organize
//! them into a per-taxonomy-id tree, run dbCAN over each genome and
//! aggregate the per-genome overview reports into summary tables.

pub mod annotate;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod fs_util;
pub mod layout;
pub mod metadata;
pub mod place;
pub mod summary;
pub mod timing;
