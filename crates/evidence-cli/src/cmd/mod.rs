pub mod hash_tree;
pub mod manifest;
pub mod sources;
pub mod verify;
