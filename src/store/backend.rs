use std::{
    fmt, fs,
    io::ErrorKind,
    marker::PhantomData,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use serde::{Serialize, de::DeserializeOwned};

use super::StoreError;
use crate::infra::fs::write_atomic;

/// Raw text persistence for one store document.
pub trait DocumentBackend: Send + Sync + fmt::Debug {
    /// `Ok(None)` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, contents: &str) -> Result<(), StoreError>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: self.describe(),
                source,
            }),
        }
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        write_atomic(&self.path, contents.as_bytes()).map_err(|source| StoreError::Io {
            path: self.describe(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
}

impl DocumentBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

/// A TOML document of type `T` on top of a backend.
#[derive(Debug)]
pub(crate) struct Document<T> {
    backend: Box<dyn DocumentBackend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Document<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub(crate) fn new(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    pub(crate) fn describe(&self) -> String {
        self.backend.describe()
    }

    pub(crate) fn load(&self) -> Result<T, StoreError> {
        match self.backend.read()? {
            Some(text) if !text.trim().is_empty() => {
                toml::from_str(&text).map_err(|err| StoreError::Parse {
                    location: self.describe(),
                    reason: err.to_string(),
                })
            }
            _ => Ok(T::default()),
        }
    }

    pub(crate) fn save(&self, value: &T) -> Result<(), StoreError> {
        let text =
            toml::to_string_pretty(value).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.backend.write(&text)
    }

    /// Load, mutate, save. Nothing is written when `apply` fails.
    pub(crate) fn update<R>(
        &self,
        apply: impl FnOnce(&mut T) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut value = self.load()?;
        let out = apply(&mut value)?;
        self.save(&value)?;
        Ok(out)
    }
}
