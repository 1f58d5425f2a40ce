#[cfg(test)]
mod file_tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::error::{Error, ErrorKind};
    use crate::locator::{Psr4Locator, SourceTreeLocator};
    use crate::{DocBlock, PhpFile};

    const SKELETON: &str = "<?php\n\nnamespace Foo\\Bar;\n\nclass ClassName\n{\n}";

    fn temp_path(dir: &TempDir) -> PathBuf {
        dir.path().join("ClassName.php")
    }

    fn make_temp_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_cant_create_files_that_exist() {
        let dir = TempDir::new().unwrap();
        let path = make_temp_file(&dir, "Existing.php", "something");

        let err = PhpFile::create(&path, "Test\\Namespace", "ClassName").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(
            err.to_string(),
            format!("Cannot create {}. File already exists.", path.display())
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "something");
    }

    #[test]
    fn test_creates_proper_class() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir);

        let file = PhpFile::create(&path, "Foo\\Bar", "ClassName").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SKELETON);
        assert_eq!(file.filename(), path.as_path());
        assert_eq!(file.contents(), SKELETON);
        assert!(!file.is_modified());
    }

    #[test]
    fn test_cant_open_files_that_dont_exist() {
        let err = PhpFile::open("/tmp/fakefile-php-editor.php").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "Cannot open /tmp/fakefile-php-editor.php. File does not exist."
        );
    }

    #[test]
    fn test_open_file() {
        let dir = TempDir::new().unwrap();
        let contents = "<?php\n\nnamespace Bar\\Baz;\n\nclass CustomClass\n{\n}";
        let path = make_temp_file(&dir, "CustomClass.php", contents);

        let file = PhpFile::open(&path).unwrap();
        assert_eq!(file.filename(), path.as_path());
        assert_eq!(file.contents(), contents);
    }

    #[test]
    fn test_open_or_create() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir);
        assert!(!path.exists());

        PhpFile::open_or_create(&path, "Foo\\Bar", "ClassName").unwrap();
        assert!(path.exists());

        // an existing file is opened as is
        let file = PhpFile::open_or_create(&path, "Bar\\Baz", "CustomClass").unwrap();
        assert_eq!(file.contents(), SKELETON);
    }

    #[test]
    fn test_cant_load_classes_that_dont_exist() {
        let dir = TempDir::new().unwrap();
        let locator = SourceTreeLocator::new([dir.path()]);

        let err = PhpFile::for_class("Bogus\\ClassName", &locator).err().unwrap();
        assert!(matches!(err, Error::ClassNotFound(_)));
        assert_eq!(err.to_string(), "Bogus\\ClassName does not exist.");
    }

    #[test]
    fn test_finds_file_by_class() {
        let dir = TempDir::new().unwrap();
        let contents = "<?php\n\nnamespace Bar\\Baz;\n\nclass CustomClass\n{\n}";
        let path = make_temp_file(&dir, "whatever.php", contents);

        let locator = SourceTreeLocator::new([dir.path()]);
        let file = PhpFile::for_class("Bar\\Baz\\CustomClass", &locator).unwrap();
        assert_eq!(file.filename(), path.as_path());
        assert_eq!(file.contents(), contents);
    }

    #[test]
    fn test_finds_file_through_psr4() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/Models")).unwrap();
        let path = make_temp_file(&dir, "src/Models/User.php", "<?php\nnamespace App\\Models;\nclass User {}\n");

        let mut locator = Psr4Locator::new();
        locator.add_prefix("App\\", dir.path().join("src"));

        let file = PhpFile::for_class("\\App\\Models\\User", &locator).unwrap();
        assert_eq!(file.filename(), path.as_path());
    }

    #[test]
    fn test_adds_public_method() {
        let dir = TempDir::new().unwrap();
        let mut file = PhpFile::create(temp_path(&dir), "Foo\\Bar", "ClassName").unwrap();

        file.add_public_method("foobar", "return true;", &DocBlock::new())
            .unwrap();

        assert_eq!(
            file.contents(),
            "<?php\n\nnamespace Foo\\Bar;\n\nclass ClassName\n{\n    /**\n     *\n     */\n    public function foobar()\n    {\n        return true;\n    }\n}"
        );
    }

    #[test]
    fn test_adds_protected_and_private_methods() {
        let dir = TempDir::new().unwrap();
        let mut file = PhpFile::create(temp_path(&dir), "Foo\\Bar", "ClassName").unwrap();

        file.add_protected_method("foobar", "return true;", &DocBlock::new())
            .unwrap()
            .add_private_method("bazqux", "return false;", &DocBlock::new())
            .unwrap();

        let contents = file.contents();
        assert!(contents.contains("protected function foobar()"));
        assert!(contents.contains("private function bazqux()"));
    }

    #[test]
    fn test_sorts_use_by_length_then_alpha() {
        let dir = TempDir::new().unwrap();
        let mut file = PhpFile::create(temp_path(&dir), "Foo\\Bar", "ClassName").unwrap();

        file.add_use(["Foo\\Bar\\Cat"]).unwrap();
        file.add_use(["Jhoff\\PhpEditor\\File"]).unwrap();
        file.add_use(["Foo\\Bar\\Baz"]).unwrap();

        assert_eq!(
            file.contents(),
            "<?php\n\nnamespace Foo\\Bar;\n\nuse Foo\\Bar\\Baz;\nuse Foo\\Bar\\Cat;\nuse Jhoff\\PhpEditor\\File;\n\nclass ClassName\n{\n}"
        );
    }

    #[test]
    fn test_changes_are_written_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir);
        let mut file = PhpFile::create(&path, "Foo\\Bar", "ClassName").unwrap();

        file.add_use(["Foo\\Bar\\Baz"]).unwrap();
        assert!(file.is_modified());
        file.write().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), file.contents());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<?php\n\nnamespace Foo\\Bar;\n\nuse Foo\\Bar\\Baz;\n\nclass ClassName\n{\n}"
        );

        // reopening sees the written file as the new original
        let reopened = PhpFile::open(&path).unwrap();
        assert!(!reopened.is_modified());
        assert_eq!(reopened.contents(), file.contents());
    }

    #[test]
    fn test_parse_errors_surface_on_open() {
        let dir = TempDir::new().unwrap();
        let path = make_temp_file(&dir, "Broken.php", "<?php\nclass Broken {\n");

        let err = PhpFile::open(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_filename_is_kept_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = make_temp_file(&dir, "A.php", "<?php\nclass A {}\n");
        let file = PhpFile::open(&path).unwrap();
        assert_eq!(file.filename(), Path::new(&path));
    }
}

#[cfg(test)]
mod storage_tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use crate::config::Style;
    use crate::error::{Error, Result};
    use crate::operations::{AddMethodOp, Operation};
    use crate::storage::Storage;
    use crate::syntax::Visibility;
    use crate::{DocBlock, PhpFile};

    #[derive(Default)]
    struct MemoryStorage {
        files: RefCell<HashMap<PathBuf, String>>,
    }

    impl Storage for &MemoryStorage {
        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }

        fn read_all(&self, path: &Path) -> Result<String> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
        }

        fn write_all(&self, path: &Path, contents: &str) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_create_and_write_through_custom_storage() {
        let storage = MemoryStorage::default();
        let path = Path::new("src/Thing.php");
        let style = Style {
            indent: "\t".to_string(),
            final_newline: true,
            ..Style::default()
        };

        let mut file = PhpFile::create_with(path, "App", "Thing", &storage, style).unwrap();
        assert_eq!(
            storage.files.borrow()[path],
            "<?php\n\nnamespace App;\n\nclass Thing\n{\n}\n"
        );

        file.add_public_method("run", "return 1;", &Default::default())
            .unwrap();
        file.write().unwrap();

        assert_eq!(
            storage.files.borrow()[path],
            "<?php\n\nnamespace App;\n\nclass Thing\n{\n\t/**\n\t *\n\t */\n\tpublic function run()\n\t{\n\t\treturn 1;\n\t}\n}\n"
        );
    }

    #[test]
    fn test_new_file_is_written_once_after_edits() {
        let storage = MemoryStorage::default();
        let path = Path::new("src/Job.php");

        let mut file =
            PhpFile::open_or_new_with(path, "App", "Job", &storage, Style::default()).unwrap();
        assert!(file.is_new());
        assert!(file.is_modified());
        assert!(storage.files.borrow().is_empty());

        let bad = Operation::AddMethod(AddMethodOp {
            name: "1bad".into(),
            visibility: Visibility::Public,
            body: String::new(),
            doc: DocBlock::new(),
        });
        assert!(file.apply(&bad).is_err());
        assert!(!storage.files.borrow().contains_key(path));

        file.add_public_method("handle", "return;", &DocBlock::new())
            .unwrap();
        file.write().unwrap();

        assert!(!file.is_new());
        assert!(storage.files.borrow()[path].contains("public function handle()"));
    }

    #[test]
    fn test_open_or_new_opens_existing_file() {
        let storage = MemoryStorage::default();
        let path = Path::new("src/Job.php");
        let source = "<?php\nclass Job\n{\n}\n";
        (&storage).write_all(path, source).unwrap();

        let file =
            PhpFile::open_or_new_with(path, "App", "Job", &storage, Style::default()).unwrap();
        assert!(!file.is_new());
        assert!(!file.is_modified());
        assert_eq!(file.contents(), source);
    }

    #[test]
    fn test_open_with_missing_file() {
        let storage = MemoryStorage::default();
        let err = PhpFile::open_with("Nope.php", &storage, Style::default()).err().unwrap();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}

#[cfg(test)]
mod preservation_tests {
    use pretty_assertions::assert_eq;

    use crate::docblock::{DocBlock, TagValue};
    use crate::editor::PhpEditor;
    use crate::operations::{AddMethodOp, AddUseOp, Operation};
    use crate::syntax::Visibility;

    const LEGACY: &str = r#"<?php
/**
 * Legacy service, hand formatted.
 */
namespace Acme\Billing;

use Acme\Support\Money;
use Psr\Log\LoggerInterface;

interface Chargeable {}

abstract class Invoice implements Chargeable
{
	const STATUS_OPEN = 'open';   // tabs on purpose

	/** @var Money[] */
	protected $lines = [];

	public function total() : Money
	{
		$sum = Money::zero();
		foreach ($this->lines as $line)   {
			$sum = $sum->add($line);   // accumulate
		}

		return $sum;
	}

	abstract protected function number(): string;
}

function helper() { return 42; }
"#;

    #[test]
    fn test_unmodified_round_trip() {
        let editor = PhpEditor::parse(LEGACY).unwrap();
        assert_eq!(editor.render(), LEGACY);
    }

    #[test]
    fn test_existing_members_survive_new_method() {
        let mut doc = DocBlock::new();
        doc.set_message("Whether the invoice has lines")
            .set_tag("return", "bool");

        let mut editor = PhpEditor::parse(LEGACY).unwrap();
        editor
            .add_public_method("hasLines", "return count($this->lines) > 0;", &doc)
            .unwrap();

        let expected = LEGACY.replace(
            "\tabstract protected function number(): string;\n}",
            "\tabstract protected function number(): string;\n\n    /**\n     * Whether the invoice has lines\n     *\n     * @return bool\n     */\n    public function hasLines()\n    {\n        return count($this->lines) > 0;\n    }\n}",
        );
        assert_eq!(editor.render(), expected);
    }

    #[test]
    fn test_interface_before_class_stays_in_order() {
        let mut editor = PhpEditor::parse(LEGACY).unwrap();
        editor.add_use(["Acme\\Tax"]).unwrap();

        let rendered = editor.render();
        assert!(rendered.starts_with(
            "<?php\n/**\n * Legacy service, hand formatted.\n */\nnamespace Acme\\Billing;\n\nuse Acme\\Tax;\nuse Acme\\Support\\Money;\nuse Psr\\Log\\LoggerInterface;\n\ninterface Chargeable {}\n\nabstract class Invoice implements Chargeable\n{\n\tconst STATUS_OPEN"
        ));
        assert!(rendered.ends_with("\tabstract protected function number(): string;\n}\n\nfunction helper() { return 42; }\n"));
    }

    #[test]
    fn test_operations_dispatch() {
        let mut doc = DocBlock::new();
        doc.set_tag("internal", TagValue::Flag);

        let mut editor = PhpEditor::parse("<?php\n\nclass A\n{\n}\n").unwrap();
        editor
            .apply(&Operation::AddUse(AddUseOp {
                names: vec!["B\\C".into()],
            }))
            .unwrap()
            .apply(&Operation::AddMethod(AddMethodOp {
                name: "go".into(),
                visibility: Visibility::Private,
                body: "return;".into(),
                doc,
            }))
            .unwrap();

        assert_eq!(
            editor.render(),
            "<?php\n\nuse B\\C;\n\nclass A\n{\n    /**\n     * @internal\n     */\n    private function go()\n    {\n        return;\n    }\n}\n"
        );
    }
}
