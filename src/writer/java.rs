//! Write the generated Java units to disk.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::model::TranspiledProgram;

/// Write the main unit and every struct unit into `out_dir`, returning the
/// paths written, main unit first.
pub fn emit(program: &TranspiledProgram, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(1 + program.auxiliary.len());

    written.push(write_unit(out_dir, &program.class_name, &program.source)?);
    for aux in &program.auxiliary {
        written.push(write_unit(out_dir, &aux.name, &aux.source)?);
    }
    Ok(written)
}

/// Write one unit as `<name>.java`.
pub fn write_unit(out_dir: &Path, name: &str, source: &str) -> io::Result<PathBuf> {
    let path = out_dir.join(format!("{name}.java"));
    let mut file = File::create(&path)?;
    write!(file, "{source}")?;
    if !source.ends_with('\n') {
        writeln!(file)?;
    }
    Ok(path)
}
