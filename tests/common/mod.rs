//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const DEFINITIONS: &str = "\
create table dbo.PUBACC_HD
(
      record_type               char(2)              not null,
      name1                     varchar(20)          null,
      name2                     varchar(20)          null
)
go

create table dbo.PUBACC_AC
(
      record_type               char(2)              not null,
      val                       varchar(20)          null
)
go
";

/// Lay out `<base>/definitions/uls_definitions.txt`
pub fn write_definitions(base: &Path) -> PathBuf {
    let dir = base.join("definitions");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("uls_definitions.txt");
    fs::write(&path, DEFINITIONS).unwrap();
    path
}

pub fn write_input(base: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = base.join(name);
    fs::write(&path, content).unwrap();
    path
}
