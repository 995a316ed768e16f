//! Purpose: Describe which virtual files a module registers and how writes are bounded.
//! Exports: `ModuleConfig`, `FileSpec`, `MAX_WRITE_BYTES_ENV`.
//! Role: Loaded by hosts from JSON or built in code; consumed by `api::Module::load`.
//! Invariants: Defaults match the classic layout (`running_total`, `sorted_list`, `my_piddo`).
//! Invariants: `validate` runs before any file is registered.
use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::core::file::{DEFAULT_MAX_WRITE_BYTES, FileMode};

pub const MAX_WRITE_BYTES_ENV: &str = "PROCSTATE_MAX_WRITE_BYTES";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub name: String,
    pub mode: u32,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, mode: FileMode) -> Self {
        Self {
            name: name.into(),
            mode: mode.bits(),
        }
    }

    pub fn file_mode(&self) -> FileMode {
        FileMode::new(self.mode)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub running_total: FileSpec,
    pub sorted_list: FileSpec,
    pub identity_override: FileSpec,
    pub identity_override_enabled: bool,
    pub max_write_bytes: usize,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            running_total: FileSpec::new("running_total", FileMode::READ_WRITE),
            sorted_list: FileSpec::new("sorted_list", FileMode::READ_WRITE),
            identity_override: FileSpec::new("my_piddo", FileMode::WRITE_ONLY),
            identity_override_enabled: true,
            max_write_bytes: DEFAULT_MAX_WRITE_BYTES,
        }
    }
}

impl ModuleConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid module config")
                .with_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            let kind = match err.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::NotFound,
                std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
                _ => ErrorKind::Internal,
            };
            Error::new(kind)
                .with_message(format!("failed to read config {}", path.display()))
                .with_source(err)
        })?;
        Self::from_json_str(&text)
    }

    /// Applies overrides looked up by variable name, e.g. `|key| std::env::var(key).ok()`.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Error> {
        if let Some(raw) = lookup(MAX_WRITE_BYTES_ENV) {
            self.max_write_bytes = raw.trim().parse().map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("{MAX_WRITE_BYTES_ENV} must be a byte count, got {raw:?}"))
                    .with_source(err)
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Every file spec this config registers, in registration order.
    pub fn file_specs(&self) -> Vec<&FileSpec> {
        let mut specs = vec![&self.running_total, &self.sorted_list];
        if self.identity_override_enabled {
            specs.push(&self.identity_override);
        }
        specs
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_write_bytes == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("max_write_bytes must be positive"));
        }
        let mut seen = BTreeSet::new();
        for spec in self.file_specs() {
            if spec.name.is_empty() {
                return Err(Error::new(ErrorKind::Usage).with_message("file name must not be empty"));
            }
            if spec.name.contains('/') {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("file name must not contain '/'")
                    .with_file(spec.name.as_str()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("file names must be unique")
                    .with_file(spec.name.as_str()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_WRITE_BYTES_ENV, ModuleConfig};
    use crate::core::error::ErrorKind;
    use crate::core::file::{Access, FileMode};
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ModuleConfig::default();
        config.validate().expect("valid");
        let names: Vec<_> = config.file_specs().iter().map(|spec| spec.name.clone()).collect();
        assert_eq!(names, ["running_total", "sorted_list", "my_piddo"]);
        assert_eq!(config.identity_override.file_mode(), FileMode::WRITE_ONLY);
        assert!(!config.identity_override.file_mode().allows(Access::Read));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ModuleConfig::from_json_str(
            r#"{"sorted_list": {"name": "sorted", "mode": 420}, "max_write_bytes": 64}"#,
        )
        .expect("config");
        assert_eq!(config.sorted_list.name, "sorted");
        assert_eq!(config.sorted_list.mode, 0o644);
        assert_eq!(config.running_total.name, "running_total");
        assert_eq!(config.max_write_bytes, 64);
    }

    #[test]
    fn invalid_configs_are_usage_errors() {
        let cases = [
            r#"{"max_write_bytes": 0}"#,
            r#"{"running_total": {"name": "", "mode": 438}}"#,
            r#"{"running_total": {"name": "a/b", "mode": 438}}"#,
            r#"{"sorted_list": {"name": "running_total", "mode": 438}}"#,
            r#"{"max_write_bytes": "lots"}"#,
        ];
        for text in cases {
            let err = ModuleConfig::from_json_str(text).expect_err(text);
            assert_eq!(err.kind(), ErrorKind::Usage, "{text}");
        }
    }

    #[test]
    fn disabled_identity_override_frees_its_name() {
        let config = ModuleConfig::from_json_str(
            r#"{"identity_override_enabled": false,
                "identity_override": {"name": "sorted_list", "mode": 146}}"#,
        )
        .expect("config");
        assert_eq!(config.file_specs().len(), 2);
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"max_write_bytes": 128}}"#).expect("write");
        let config = ModuleConfig::load(file.path()).expect("load");
        assert_eq!(config.max_write_bytes, 128);

        let dir = tempfile::tempdir().expect("tempdir");
        let err = ModuleConfig::load(dir.path().join("missing.json")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn overrides_apply_write_bound() {
        let config = ModuleConfig::default()
            .with_overrides_from(|key| (key == MAX_WRITE_BYTES_ENV).then(|| " 512 ".to_string()))
            .expect("override");
        assert_eq!(config.max_write_bytes, 512);

        let err = ModuleConfig::default()
            .with_overrides_from(|_| Some("many".to_string()))
            .expect_err("bad override");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let unchanged = ModuleConfig::default()
            .with_overrides_from(|_| None)
            .expect("no override");
        assert_eq!(unchanged, ModuleConfig::default());
    }
}
