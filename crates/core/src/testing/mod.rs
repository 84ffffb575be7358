//! Test doubles and fixtures for exercising the pipeline without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use hlspack_core::testing::{fixtures, MockPackager};
//!
//! let ws = fixtures::workspace(tmp.path());
//! let src = fixtures::source_file(&ws, "intro.mp4", b"fake video");
//! let packager = Arc::new(MockPackager::new());
//! ```

mod mock_packager;

pub use mock_packager::{MockCall, MockPackager, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::keyinfo::KeyMaterial;
    use crate::workspace::Workspace;

    pub const KEY_URI: &str = "https://keys.example.com/hls/enc.key";

    /// Create a workspace under `root` with its directories and key files.
    pub fn workspace(root: &Path) -> Workspace {
        let ws = Workspace::new(root);
        ws.ensure_dirs().unwrap();
        std::fs::write(ws.keyinfo_path(), format!("{}\n", KEY_URI)).unwrap();
        std::fs::write(ws.key_path(), [7u8; 16]).unwrap();
        ws
    }

    /// Load the key material written by [`workspace`].
    pub fn key_material(ws: &Workspace) -> KeyMaterial {
        KeyMaterial::load(&ws.keyinfo_path(), &ws.key_path()).unwrap()
    }

    /// Create a source file in the workspace's `input/` directory.
    pub fn source_file(ws: &Workspace, name: &str, contents: &[u8]) -> PathBuf {
        let path = ws.input_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}
