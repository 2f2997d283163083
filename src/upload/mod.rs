//! Staging of input artifacts into object storage before submission.

pub mod swift;

pub use swift::SwiftStorage;

use std::path::Path;

use async_trait::async_trait;

use crate::config::SwiftConf;
use crate::error::SubmitError;

/// One upload backend, selected by the protocol segment of the application
/// path.
#[async_trait]
pub trait ObjectStorage: Send {
    /// Upload a file, or the direct children of a directory, into
    /// `container`. Objects are named after the file base name.
    async fn upload(&mut self, source: &Path, container: &str) -> Result<(), SubmitError>;
}

pub fn for_protocol(
    protocol: &str,
    swift: Option<&SwiftConf>,
) -> Result<Box<dyn ObjectStorage>, SubmitError> {
    match protocol {
        "swift" => {
            let conf = swift.ok_or_else(|| {
                SubmitError::Config("no [swift] configuration found".to_string())
            })?;
            Ok(Box::new(SwiftStorage::new(conf.clone())))
        }
        other => Err(SubmitError::Config(format!(
            "{other} protocol not implemented yet"
        ))),
    }
}

/// Content type from the file extension. The API cares about Python sources
/// being tagged as such; everything else gets a conventional type.
pub fn detect_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("py") => "application/x-python",
        Some("jar") => "application/java-archive",
        Some("json") => "application/json",
        Some("txt") | Some("csv") | Some("conf") | Some("properties") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_sources_are_tagged() {
        assert_eq!(
            detect_content_type(Path::new("job/main.py")),
            "application/x-python"
        );
    }

    #[test]
    fn jars_and_unknowns() {
        assert_eq!(
            detect_content_type(Path::new("app.jar")),
            "application/java-archive"
        );
        assert_eq!(
            detect_content_type(Path::new("data.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn unconfigured_protocols_are_rejected() {
        assert!(for_protocol("s3", None).is_err());
        assert!(for_protocol("swift", None).is_err());
    }
}
