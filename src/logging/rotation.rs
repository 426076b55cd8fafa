// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Size based log rotation with numbered files
//!
//! `main.log` is the active file. When it would grow past the size limit it
//! becomes `main001.log`, then `main002.log` on the next rotation, and so on.
//! Only the newest numbered file is kept next to the active one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct NumberedRotatingFile {
    path: PathBuf,
    dir: PathBuf,
    stem: String,
    ext: String,
    max_bytes: u64,
    written: u64,
    counter: u32,
    file: File,
}

impl NumberedRotatingFile {
    /// Open (or create) `path` for appending.
    ///
    /// Numbering resumes after the highest rotated file found next to
    /// `path`; older rotated files are removed.
    pub fn open<P: AsRef<Path>>(path: P, max_bytes: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut numbered = Self::existing_numbers(&dir, &stem, &ext)?;
        numbered.sort_unstable();
        let counter = numbered.last().map(|n| n + 1).unwrap_or(1);
        if numbered.len() > 1 {
            for old in &numbered[..numbered.len() - 1] {
                let _ = fs::remove_file(dir.join(format!("{}{:03}{}", stem, old, ext)));
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            dir,
            stem,
            ext,
            max_bytes,
            written,
            counter,
            file,
        })
    }

    /// Number the next rotation will use
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn numbered_path(&self, number: u32) -> PathBuf {
        self.dir.join(format!("{}{:03}{}", self.stem, number, self.ext))
    }

    fn existing_numbers(dir: &Path, stem: &str, ext: &str) -> io::Result<Vec<u32>> {
        let mut numbers = Vec::new();
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            let digits = name
                .strip_prefix(stem)
                .and_then(|rest| rest.strip_suffix(ext));
            if let Some(digits) = digits {
                if digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(number) = digits.parse() {
                        numbers.push(number);
                    }
                }
            }
        }
        Ok(numbers)
    }

    /// Move the active file to the next number and start a fresh one.
    ///
    /// Only a failed flush is an error. A file that cannot be renamed keeps
    /// growing, and a stale numbered file that cannot be removed stays on
    /// disk; both are reported on stderr since the logger itself writes here.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.written = 0;
        let target = self.numbered_path(self.counter);
        if let Err(e) = fs::rename(&self.path, &target) {
            eprintln!(
                "Cannot rotate {} to {}: {}",
                self.path.display(),
                target.display(),
                e
            );
            return Ok(());
        }
        self.counter += 1;
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => self.file = file,
            Err(e) => eprintln!(
                "Cannot reopen {}, logging to {}: {}",
                self.path.display(),
                target.display(),
                e
            ),
        }

        if self.counter > 2 {
            let previous = self.numbered_path(self.counter - 2);
            if previous.exists() {
                if let Err(e) = fs::remove_file(&previous) {
                    eprintln!("Cannot remove old log {}: {}", previous.display(), e);
                }
            }
        }
        Ok(())
    }
}

impl Write for NumberedRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0
            && self.written > 0
            && self.written + buf.len() as u64 > self.max_bytes
        {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
