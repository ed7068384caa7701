//! CSV reports.
//!
//! Each report is a `Serialize` row type registered with [`ContextReportExt::add_report`]. Rows
//! sent with [`ContextReportExt::send_report`] are appended to
//! `<directory>/<file_prefix><short_name>.csv` and flushed immediately.
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;
use log::trace;

use crate::context::Context;
use crate::error::SimError;
use crate::hashing::HashMap;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Implements [`Report`] for a `Serialize` row type.
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files go and whether existing files may be replaced.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> ReportOptions {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    fn path_for(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{short_name}.csv", self.file_prefix))
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

crate::context::define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ReportOptions::new(),
    }
);

pub trait ContextReportExt {
    /// Returns the options used by subsequent calls to `add_report`.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Creates the CSV file for report type `T`. The header is written with the first row.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the file exists and overwriting is disabled, or if `T` already
    /// has a writer; returns `IoError` if the directory or file cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), SimError>;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if `T` was never added or the row cannot be written.
    fn send_report<T: Report>(&self, report: T) -> Result<(), SimError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_container_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), SimError> {
        let data_container = self.get_data_container_mut(ReportPlugin);
        let path = data_container.config.path_for(short_name);
        if data_container
            .file_writers
            .get_mut()
            .contains_key(&TypeId::of::<T>())
        {
            return Err(SimError::ReportError(format!(
                "a report writer for {short_name} already exists"
            )));
        }
        if path.exists() && !data_container.config.overwrite {
            return Err(SimError::ReportError(format!(
                "{} already exists; pass --force-overwrite to replace it",
                path.display()
            )));
        }

        create_dir_all(&data_container.config.directory)?;
        let file = File::create(&path)?;
        trace!("writing report {short_name} to {}", path.display());
        data_container
            .file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), SimError> {
        let missing = || SimError::ReportError("No writer found for the report type".to_string());
        // No data container will exist if no reports have been added
        let data_container = self.get_data_container(ReportPlugin).ok_or_else(missing)?;
        let mut writer_cell = data_container.file_writers.borrow_mut();
        let writer = writer_cell.get_mut(&report.type_id()).ok_or_else(missing)?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}
