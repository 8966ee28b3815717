//! Navigate module
//!
//! Handles path resolution and directory navigation for the session,
//! including changing directories and moving to the parent.

mod operations;

pub use operations::{
    VirtualPath, change_directory, change_to_parent, containing_dir, parent, resolve, root,
};
