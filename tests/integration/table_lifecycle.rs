#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use rowbase::primitives::pager::PagerOptions;
use rowbase::storage::{Row, Table, TableOptions, TreeShape};
use rowbase::types::{PageId, Result, StoreError};
use tempfile::TempDir;

fn row(id: u32) -> Row {
    Row::new(id, &format!("user{id}"), &format!("person{id}@example.com")).expect("row fits")
}

fn ids(table: &mut Table) -> Result<Vec<u32>> {
    Ok(table.rows()?.into_iter().map(|r| r.id).collect())
}

fn fill(path: &Path, keys: impl IntoIterator<Item = u32>) -> Result<()> {
    let mut table = Table::open(path)?;
    for key in keys {
        table.insert_row(&row(key))?;
    }
    table.close()
}

#[test]
fn three_rows_scan_in_order() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("a.db");
    fill(&path, [1, 2, 3])?;
    assert_eq!(fs::metadata(&path)?.len(), 4096);

    let mut table = Table::open(&path)?;
    let rows = table.rows()?;
    assert_eq!(rows, vec![row(1), row(2), row(3)]);
    assert_eq!(rows[0].to_string(), "(1, user1, person1@example.com)");
    Ok(())
}

#[test]
fn fourteen_rows_split_the_root_once() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("b.db");
    fill(&path, 1..=14)?;
    assert_eq!(fs::metadata(&path)?.len(), 3 * 4096);

    let mut table = Table::open(&path)?;
    let shape = table.tree_shape()?;
    let TreeShape::Internal { page, keys, children } = &shape else {
        panic!("root should be internal: {shape:?}");
    };
    assert_eq!(*page, PageId(0));
    assert_eq!(keys, &vec![7]);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].keys().len(), 7);
    assert_eq!(children[1].keys().len(), 7);
    assert_eq!(children[0].keys().last(), Some(&7));
    assert_eq!(children[1].page(), PageId(1));
    assert_eq!(ids(&mut table)?, (1..=14).collect::<Vec<_>>());

    let expected_dump = "\
- internal (size 1)
  - leaf (size 7)
    - 1
    - 2
    - 3
    - 4
    - 5
    - 6
    - 7
  - key 7
  - leaf (size 7)
    - 8
    - 9
    - 10
    - 11
    - 12
    - 13
    - 14
";
    assert_eq!(shape.to_string(), expected_dump);
    Ok(())
}

#[test]
fn reopen_preserves_a_split_tree() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("c.db");
    let evens: Vec<u32> = (1..=14).map(|k| k * 2).collect();
    let odds_left = [1, 3, 5, 7, 9, 11];
    let odds_right = [17, 19, 21, 23, 25, 27];
    fill(
        &path,
        evens
            .iter()
            .copied()
            .chain(odds_left)
            .chain(odds_right.iter().rev().copied()),
    )?;

    let mut table = Table::open(&path)?;
    let mut expected: Vec<u32> = evens;
    expected.extend(odds_left);
    expected.extend(odds_right);
    expected.sort_unstable();
    assert_eq!(ids(&mut table)?, expected);
    let report = table.verify()?;
    assert!(report.success, "{:?}", report.findings);
    assert_eq!(report.counts.rows, 26);
    Ok(())
}

#[test]
fn duplicate_insert_leaves_file_identical() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("d.db");
    fill(&path, [4, 8, 15, 16, 23, 42])?;
    let before = fs::read(&path)?;

    let mut table = Table::open(&path)?;
    match table.insert_row(&row(15)) {
        Err(StoreError::DuplicateKey(15)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    table.close()?;
    assert_eq!(fs::read(&path)?, before);
    Ok(())
}

#[test]
fn failed_non_root_split_leaves_file_identical() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("e.db");
    fill(&path, 1..=20)?;
    let before = fs::read(&path)?;

    let mut table = Table::open(&path)?;
    match table.insert_row(&row(21)) {
        Err(StoreError::SplitNotImplemented(page)) => assert_eq!(page, PageId(1)),
        other => panic!("unexpected result: {other:?}"),
    }
    table.close()?;
    assert_eq!(fs::read(&path)?, before);
    Ok(())
}

#[test]
fn file_with_partial_page_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("f.db");
    fs::write(&path, vec![0u8; 4096 + 1])?;
    match Table::open(&path) {
        Err(StoreError::CorruptFile { len, .. }) => assert_eq!(len, 4097),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt file opened"),
    }
    Ok(())
}

#[test]
fn page_capacity_bounds_growth() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("g.db");
    let options = TableOptions {
        pager: PagerOptions { max_pages: 2 },
        ..TableOptions::default()
    };
    let mut table = Table::open_with(&path, options)?;
    for key in 1..=13 {
        table.insert_row(&row(key))?;
    }
    let err = table.insert_row(&row(14)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "tried to fetch page number out of bounds: 2 >= 2"
    );
    assert_eq!(ids(&mut table)?, (1..=13).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn unopenable_path_reports_open_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("missing").join("h.db");
    match Table::open(&path) {
        Err(StoreError::Open { path: reported, .. }) => assert_eq!(reported, path),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("opened a file in a missing directory"),
    }
}

#[test]
fn pager_stats_track_faults_and_flushes() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("i.db");
    fill(&path, 1..=14)?;

    let mut table = Table::open(&path)?;
    let _ = ids(&mut table)?;
    let stats = table.pager_stats();
    assert_eq!(stats.page_count, 3);
    assert_eq!(stats.resident_pages, 3);
    assert_eq!(stats.disk_reads, 3);
    assert_eq!(stats.flushes, 0);
    Ok(())
}
