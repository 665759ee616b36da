use abf::{
    find_format, load_cubes, AbfField, LoadError, ReadFieldError, ReadGridError, TranslateError,
    X_SIZE, Y_SIZE,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Writes a payload where every byte equals its flat index modulo 256.
fn write_ramp(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let buf: Vec<u8> = (0..X_SIZE * Y_SIZE).map(|i| i as u8).collect();
    fs::write(&path, buf).unwrap();
    path
}

fn write_const(dir: &Path, name: &str, value: u8) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![value; X_SIZE * Y_SIZE]).unwrap();
    path
}

fn pattern(dir: &TempDir, glob: &str) -> String {
    dir.path().join(glob).to_str().unwrap().to_string()
}

#[test]
fn decode_field_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ramp(dir.path(), "my-prefix12-9876marb-abf");

    let field = AbfField::new(&path).unwrap();
    let raw = field.read().unwrap();
    assert_eq!((raw.version, raw.year, raw.month), (12, 9876, 3));
    assert_eq!(raw.period, 'b');
    assert_eq!(raw.format, "abf");
    assert_eq!(raw.data.shape(), (2160, 4320));
    assert!(raw.data.is_masked([0, 0]));
    assert_eq!(raw.data.get([0, 4317]), Some(31));
    assert_eq!(raw.data.get([2159, 0]), Some(0));
    assert!(field.is_loaded());

    // second read is served from the handle
    fs::remove_file(&path).unwrap();
    assert_eq!(field.read().unwrap().year, 9876);
}

#[test]
fn end_to_end_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_const(dir.path(), "AVHRRBUVI01.1988febb.abl", 42);

    let cube = AbfField::new(&path).unwrap().into_raw().unwrap().to_cube().unwrap();
    assert_eq!(cube.name(), "leaf_area_index");
    assert_eq!(cube.units(), Some("%"));
    assert_eq!(cube.data().count_masked(), 0);

    let time = cube.coord("time").unwrap();
    let bounds = time.bounds().unwrap();
    // 1988-02-16 .. 1988-02-29
    assert_eq!(time.points()[0], 725782.0);
    assert_eq!(bounds[[0, 1]] - bounds[[0, 0]], 13.0);
}

#[test]
fn truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AVHRRBUVI01.1985feba.abf");
    fs::write(&path, vec![0u8; X_SIZE * Y_SIZE - 1]).unwrap();

    let err = AbfField::new(&path).unwrap().into_raw().unwrap_err();
    assert!(matches!(err, ReadFieldError::Grid(ReadGridError::MissingData)));
}

#[test]
fn missing_file() {
    let field = AbfField::new("/no/such/dir/AVHRRBUVI01.1985feba.abf").unwrap();
    assert!(matches!(field.read(), Err(ReadFieldError::Grid(ReadGridError::Io(_)))));
}

#[test]
fn load_without_callback() {
    let dir = tempfile::tempdir().unwrap();
    write_const(dir.path(), "AVHRRBUVI01.1985feba.abf", 1);
    write_const(dir.path(), "AVHRRBUVI01.1985febb.abf", 2);
    write_const(dir.path(), "AVHRRBUVI01.1985mara.abl", 3);

    let cubes = load_cubes(pattern(&dir, "*.abf"))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(cubes.len(), 2);
    assert!(cubes.iter().all(|c| c.name() == "FAPAR"));

    let all = load_cubes([pattern(&dir, "*.abf"), pattern(&dir, "*.abl")])
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].name(), "leaf_area_index");
}

#[test]
fn load_with_callback() {
    let dir = tempfile::tempdir().unwrap();
    write_const(dir.path(), "AVHRRBUVI01.1985feba.abf", 1);
    write_const(dir.path(), "AVHRRBUVI01.1985febb.abf", 2);

    let mut seen = Vec::new();
    let cubes = load_cubes(pattern(&dir, "*.abf"))
        .with_callback(|mut cube, field, path| {
            seen.push(path.to_path_buf());
            if field.period == 'a' {
                return None;
            }
            cube.rename("replaced");
            Some(cube)
        })
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(cubes.len(), 1);
    assert_eq!(cubes[0].name(), "replaced");
    assert_eq!(cubes[0].data().get([0, 0]), Some(2));
    assert_eq!(seen.len(), 2);
}

#[test]
fn load_is_lazy_and_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    write_const(dir.path(), "AVHRRBUVI01.1985feba.abz", 1);
    let good = tempfile::tempdir().unwrap();
    write_const(good.path(), "AVHRRBUVI01.1985feba.abf", 1);

    let mut cubes = load_cubes([pattern(&dir, "*"), pattern(&good, "*")]);
    match cubes.next() {
        Some(Err(LoadError::Translate { path, source: TranslateError::UnknownFormat(tag) })) => {
            assert_eq!(tag, "abz");
            assert!(path.ends_with("AVHRRBUVI01.1985feba.abz"));
        }
        other => panic!("unexpected {other:?}"),
    }
    // the good file in the second pattern is never reached
    assert!(cubes.next().is_none());
}

#[test]
fn load_reports_short_names() {
    let dir = tempfile::tempdir().unwrap();
    write_const(dir.path(), "short.abf", 1);

    let err = load_cubes(pattern(&dir, "*.abf")).next().unwrap().unwrap_err();
    assert!(matches!(err, LoadError::Filename { .. }));
    assert!(err.to_string().contains("short.abf"));
}

#[test]
fn early_stop_reads_nothing_more() {
    let dir = tempfile::tempdir().unwrap();
    write_const(dir.path(), "AVHRRBUVI01.1985feba.abf", 1);
    write_const(dir.path(), "AVHRRBUVI01.1985febb.abf", 1);

    let mut calls = 0;
    let first = load_cubes(pattern(&dir, "*.abf"))
        .with_callback(|cube, _, _| {
            calls += 1;
            Some(cube)
        })
        .next();
    assert!(matches!(first, Some(Ok(_))));
    assert_eq!(calls, 1);
}

#[test]
fn registry_routes_to_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_const(dir.path(), "AVHRRBUVI01.1985feba.abl", 7);

    let spec = find_format(&path).unwrap();
    assert_eq!(spec.name, "ABL");
    let cubes: Vec<_> = (spec.load)(vec![path.to_str().unwrap().to_string()]).collect();
    assert_eq!(cubes.len(), 1);
    assert!(cubes[0].is_ok());
}
