use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use identity::RecordWriter;
use log::trace;

/// Appends one line per record to a file.
///
/// The file is opened on first use rather than up front, so that it is created by whichever
/// identity performs the first write.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn file(&mut self) -> Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                trace!("Opening {}", self.path.display());
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .with_context(|| format!("Opening {} failed", self.path.display()))?;
                BufWriter::new(file)
            }
        };
        Ok(self.file.insert(file))
    }
}

impl<R: AsRef<str>> RecordWriter<R> for FileWriter {
    fn write(&mut self, record: &R) -> Result<()> {
        writeln!(self.file()?, "{}", record.as_ref())?;
        Ok(())
    }

    fn write_batch(&mut self, records: &[R]) -> Result<()> {
        let file = self.file()?;
        for record in records {
            writeln!(file, "{}", record.as_ref())?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, process};

    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("impersonating_writer_{}_{}.log", process::id(), name))
    }

    #[test]
    fn nothing_is_created_before_first_write() {
        let path = scratch_path("lazy");
        let mut writer = FileWriter::new(&path);

        RecordWriter::<String>::flush(&mut writer).unwrap();
        RecordWriter::<String>::close(&mut writer).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn appends_lines_and_flushes_on_close() {
        let path = scratch_path("append");
        let _ = fs::remove_file(&path);
        let mut writer = FileWriter::new(&path);

        writer.write(&"first").unwrap();
        writer.write_batch(&["second", "third"][..]).unwrap();
        RecordWriter::<&str>::close(&mut writer).unwrap();

        let mut writer = FileWriter::new(&path);
        writer.write(&String::from("fourth")).unwrap();
        RecordWriter::<String>::close(&mut writer).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(contents, "first\nsecond\nthird\nfourth\n");
    }
}
