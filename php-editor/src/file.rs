//! A PHP class file on disk, opened for editing.
//!
//! ```no_run
//! use php_editor::{DocBlock, PhpFile};
//!
//! # fn main() -> php_editor::Result<()> {
//! let mut file = PhpFile::open_or_create("src/Models/User.php", "App\\Models", "User")?;
//! file.add_use(["Carbon\\Carbon"])?
//!     .add_public_method("touch", "$this->touched = Carbon::now();", &DocBlock::new())?;
//! file.write()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use crate::config::Style;
use crate::docblock::DocBlock;
use crate::editor::PhpEditor;
use crate::error::{Error, Result};
use crate::locator::ClassLocator;
use crate::operations::Operation;
use crate::skeleton;
use crate::storage::{FsStorage, Storage};
use crate::syntax::Visibility;

pub struct PhpFile<S: Storage = FsStorage> {
    path: PathBuf,
    editor: PhpEditor,
    storage: S,
    /// Not on storage yet; the first `write` creates it.
    new: bool,
}

impl PhpFile<FsStorage> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FsStorage, Style::default())
    }

    /// Write a class skeleton to `path` and open it. Fails if `path` exists.
    pub fn create(path: impl AsRef<Path>, namespace: &str, class: &str) -> Result<Self> {
        Self::create_with(path, namespace, class, FsStorage, Style::default())
    }

    pub fn open_or_create(path: impl AsRef<Path>, namespace: &str, class: &str) -> Result<Self> {
        Self::open_or_create_with(path, namespace, class, FsStorage, Style::default())
    }

    /// Like [`PhpFile::open_or_create`], but a missing file is only written
    /// by [`PhpFile::write`].
    pub fn open_or_new(path: impl AsRef<Path>, namespace: &str, class: &str) -> Result<Self> {
        Self::open_or_new_with(path, namespace, class, FsStorage, Style::default())
    }

    /// Open the file declaring `class`.
    pub fn for_class(class: &str, locator: &dyn ClassLocator) -> Result<Self> {
        Self::for_class_with(class, locator, FsStorage, Style::default())
    }
}

impl<S: Storage> PhpFile<S> {
    pub fn open_with(path: impl AsRef<Path>, storage: S, style: Style) -> Result<Self> {
        let path = path.as_ref();
        if !storage.exists(path) {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let source = storage.read_all(path)?;
        let editor = PhpEditor::parse_with_style(&source, style)?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "opened file");

        Ok(Self {
            path: path.to_path_buf(),
            editor,
            storage,
            new: false,
        })
    }

    pub fn create_with(
        path: impl AsRef<Path>,
        namespace: &str,
        class: &str,
        storage: S,
        style: Style,
    ) -> Result<Self> {
        let path = path.as_ref();
        if storage.exists(path) {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }

        let source = skeleton::generate(namespace, class, &style)?;
        storage.write_all(path, &source)?;
        tracing::debug!(path = %path.display(), namespace, class, "created class file");

        Self::open_with(path, storage, style)
    }

    pub fn open_or_create_with(
        path: impl AsRef<Path>,
        namespace: &str,
        class: &str,
        storage: S,
        style: Style,
    ) -> Result<Self> {
        if storage.exists(path.as_ref()) {
            Self::open_with(path, storage, style)
        } else {
            Self::create_with(path, namespace, class, storage, style)
        }
    }

    pub fn open_or_new_with(
        path: impl AsRef<Path>,
        namespace: &str,
        class: &str,
        storage: S,
        style: Style,
    ) -> Result<Self> {
        let path = path.as_ref();
        if storage.exists(path) {
            return Self::open_with(path, storage, style);
        }

        let source = skeleton::generate(namespace, class, &style)?;
        let editor = PhpEditor::parse_with_style(&source, style)?;
        tracing::debug!(path = %path.display(), namespace, class, "started class file in memory");

        Ok(Self {
            path: path.to_path_buf(),
            editor,
            storage,
            new: true,
        })
    }

    pub fn for_class_with(
        class: &str,
        locator: &dyn ClassLocator,
        storage: S,
        style: Style,
    ) -> Result<Self> {
        let path = locator
            .locate(class)
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))?;
        tracing::debug!(class, path = %path.display(), "located class");

        Self::open_with(path, storage, style)
    }

    pub fn filename(&self) -> &Path {
        &self.path
    }

    pub fn editor(&self) -> &PhpEditor {
        &self.editor
    }

    /// The file as it would be written.
    pub fn contents(&self) -> String {
        self.editor.render()
    }

    /// `true` while the file exists only in memory.
    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn is_modified(&self) -> bool {
        self.new || self.editor.is_modified()
    }

    pub fn write(&mut self) -> Result<()> {
        let contents = self.contents();
        self.storage.write_all(&self.path, &contents)?;
        self.new = false;
        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    pub fn add_method(
        &mut self,
        visibility: Visibility,
        name: &str,
        body: &str,
        doc: &DocBlock,
    ) -> Result<&mut Self> {
        self.editor.add_method(visibility, name, body, doc)?;
        Ok(self)
    }

    pub fn add_public_method(&mut self, name: &str, body: &str, doc: &DocBlock) -> Result<&mut Self> {
        self.add_method(Visibility::Public, name, body, doc)
    }

    pub fn add_protected_method(
        &mut self,
        name: &str,
        body: &str,
        doc: &DocBlock,
    ) -> Result<&mut Self> {
        self.add_method(Visibility::Protected, name, body, doc)
    }

    pub fn add_private_method(&mut self, name: &str, body: &str, doc: &DocBlock) -> Result<&mut Self> {
        self.add_method(Visibility::Private, name, body, doc)
    }

    pub fn add_use<I, T>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.editor.add_use(names)?;
        Ok(self)
    }

    pub fn apply(&mut self, operation: &Operation) -> Result<&mut Self> {
        self.editor.apply(operation)?;
        Ok(self)
    }
}
