use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::docblock::DocBlock;
use crate::error::{Error, Result};
use crate::syntax::Visibility;

/// A serializable edit, as listed in batch files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    AddMethod(AddMethodOp),
    AddUse(AddUseOp),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMethodOp {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Statements of the method body, without the braces.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub doc: DocBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddUseOp {
    pub names: Vec<String>,
}

/// Parameters of a freshly generated class file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonSpec {
    #[serde(default)]
    pub namespace: String,
    pub class: String,
}

/// A list of operations to run against one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub path: PathBuf,
    /// Create the file first if it does not exist yet.
    #[serde(default)]
    pub create: Option<SkeletonSpec>,
    pub operations: Vec<Operation>,
}

impl BatchSpec {
    /// Parse a batch file. `.yaml`/`.yml` files are read as YAML, anything
    /// else as JSON with a YAML fallback.
    pub fn parse(content: &str, source: &Path) -> Result<Self> {
        let is_yaml = matches!(
            source.extension().and_then(|s| s.to_str()),
            Some("yaml" | "yml")
        );

        let parsed = if is_yaml {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(content)
                .or_else(|_| serde_yaml::from_str(content))
                .map_err(|e| e.to_string())
        };

        parsed.map_err(|message| Error::Config {
            path: source.to_path_buf(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docblock::TagValue;

    #[test]
    fn test_batch_from_yaml() {
        let yaml = r#"
path: src/Models/User.php
create:
  namespace: App\Models
  class: User
operations:
  - type: AddUse
    names: [Carbon\Carbon, Illuminate\Support\Str]
  - type: AddMethod
    name: touch
    visibility: protected
    body: "$this->touched = Carbon::now();"
    doc:
      message: Mark the model as touched
      return: void
      internal: true
"#;
        let spec = BatchSpec::parse(yaml, Path::new("batch.yaml")).unwrap();
        assert_eq!(spec.path, PathBuf::from("src/Models/User.php"));
        assert_eq!(spec.create.as_ref().unwrap().class, "User");
        assert_eq!(spec.operations.len(), 2);

        let Operation::AddMethod(op) = &spec.operations[1] else {
            panic!("expected AddMethod");
        };
        assert_eq!(op.visibility, Visibility::Protected);
        assert_eq!(op.doc.message(), Some("Mark the model as touched"));
        assert_eq!(op.doc.tag("internal"), Some(&TagValue::Flag));
    }

    #[test]
    fn test_batch_json_with_defaults() {
        let json = r#"{"path": "A.php", "operations": [{"type": "AddMethod", "name": "run"}]}"#;
        let spec = BatchSpec::parse(json, Path::new("batch.json")).unwrap();
        assert!(spec.create.is_none());
        assert_eq!(
            spec.operations[0],
            Operation::AddMethod(AddMethodOp {
                name: "run".into(),
                visibility: Visibility::Public,
                body: String::new(),
                doc: DocBlock::new(),
            })
        );
    }

    #[test]
    fn test_batch_rejects_unknown_operation() {
        let json = r#"{"path": "A.php", "operations": [{"type": "RemoveMethod"}]}"#;
        let err = BatchSpec::parse(json, Path::new("batch.json")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
