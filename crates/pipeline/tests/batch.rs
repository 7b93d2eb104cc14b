use ndarray::Array3;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tomoconv_container::{Attribute, FailAt, MockWriter};
use tomoconv_pipeline::convert::{FIELD, MICROMETERS_PER_METER, PIXEL_SIZE, PIXEL_UNITS, PIXEL_UNITS_LABEL};
use tomoconv_pipeline::error::ErrorKind;
use tomoconv_pipeline::{Context, Depth, Request, Stage, run};
use tomoconv_volume::MockLoader;
use walkdir::WalkDir;

/// Lays out `a/b/x.txm` and `a/c/y.txm` under a fresh search root.
fn tree() -> tempfile::TempDir {
    let src = tempfile::tempdir().unwrap();
    for file in ["a/b/x.txm", "a/c/y.txm"] {
        let path = src.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
    src
}

fn request(src: &Path, dst: &Path, depth: Depth) -> Request {
    Request { depth, ..Request::new(src, dst) }
}

fn files(root: &Path) -> Vec<String> {
    let mut found: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    found.sort();
    found
}

#[rstest]
#[case::full(Depth::Full, vec!["a/b/x.hdf5", "a/c/y.hdf5"])]
#[case::flat(Depth::Limited(0), vec!["x.hdf5", "y.hdf5"])]
#[case::one(Depth::Limited(1), vec!["a/x.hdf5", "a/y.hdf5"])]
fn test_mirrors_hierarchy(#[case] depth: Depth, #[case] expected: Vec<&str>) {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new()
        .with_volume("x.txm", 2.5e-6, Array3::<u8>::zeros((3, 4, 5)))
        .with_volume("y.txm", 0.75e-6, Array3::<f32>::zeros((1, 2, 2)));
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };

    let report = run(&ctx, &request(src.path(), dst.path(), depth)).unwrap();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.converted.len(), 2);
    assert!(report.is_clean());
    assert_eq!(files(dst.path()), expected);

    let spacings = [(2.5e-6, "u8", vec![3, 4, 5]), (0.75e-6, "f32", vec![1, 2, 2])];
    for (output, (spacing, data_type, shape)) in expected.into_iter().zip(spacings) {
        let manifest = MockWriter::read(dst.path().join(output)).unwrap();
        let field = &manifest.fields[FIELD];
        assert_eq!(field.data_type, data_type);
        assert_eq!(field.shape, shape);
        assert_eq!(field.attributes[PIXEL_SIZE], Attribute::Float(spacing * MICROMETERS_PER_METER));
        assert_eq!(field.attributes[PIXEL_UNITS], Attribute::from(PIXEL_UNITS_LABEL));
    }
}

#[cfg(unix)]
#[test]
fn test_outputs_get_default_file_mode() {
    use std::os::unix::fs::PermissionsExt;
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };
    run(&ctx, &request(src.path(), dst.path(), Depth::Limited(0))).unwrap();

    let plain = dst.path().join("plain");
    fs::File::create(&plain).unwrap();
    let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&dst.path().join("x.hdf5")), mode(&plain));
    assert_eq!(mode(&dst.path().join("y.hdf5")), mode(&plain));
}

#[test]
fn test_destination_created_lazily() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let destination = dst.path().join("not/yet/there");
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };

    run(&ctx, &request(src.path(), &destination, Depth::Full)).unwrap();
    assert_eq!(files(&destination), vec!["a/b/x.hdf5", "a/c/y.hdf5"]);
}

#[test]
fn test_second_run_converts_nothing() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };
    let request = request(src.path(), dst.path(), Depth::Full);

    let first = run(&ctx, &request).unwrap();
    assert_eq!(first.converted.len(), 2);
    let second = run(&ctx, &request).unwrap();
    assert_eq!(second.discovered, 2);
    assert_eq!(second.skipped, 2);
    assert!(second.converted.is_empty());
    assert_eq!(loader.loaded().len(), 2);
}

#[test]
fn test_decode_failure_does_not_stop_batch() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new().with_corrupt("y.txm");
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };

    let report = run(&ctx, &request(src.path(), dst.path(), Depth::Full)).unwrap();
    assert_eq!(report.converted.len(), 1);
    assert_eq!(report.abandoned.len(), 1);
    let abandoned = &report.abandoned[0];
    assert_eq!(abandoned.stage, Stage::Decode);
    assert!(abandoned.pair.input.ends_with("a/c/y.txm"));
    assert!(matches!(&*abandoned.error, ErrorKind::Decode(_)));
    assert_eq!(files(dst.path()), vec!["a/b/x.hdf5"]);
}

#[test]
fn test_attribute_failure_leaves_no_output() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new().fail_at(FailAt::SetAttribute(PIXEL_SIZE.into()), "y.hdf5");
    let ctx = Context { loader: &loader, writer: &writer };

    let report = run(&ctx, &request(src.path(), dst.path(), Depth::Full)).unwrap();
    assert_eq!(report.converted.len(), 1);
    assert_eq!(report.abandoned[0].stage, Stage::Write);
    assert_eq!(files(dst.path()), vec!["a/b/x.hdf5"]);

    // The failed pair is picked up again by the next run.
    let retry = run(&Context { loader: &loader, writer: &MockWriter::new() }, &request(src.path(), dst.path(), Depth::Full))
        .unwrap();
    assert_eq!(retry.skipped, 1);
    assert_eq!(retry.converted.len(), 1);
    assert_eq!(files(dst.path()), vec!["a/b/x.hdf5", "a/c/y.hdf5"]);
}

#[test]
fn test_every_acquisition_released_once() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new().fail_at(FailAt::Close, "x.hdf5");
    let ctx = Context { loader: &loader, writer: &writer };

    run(&ctx, &request(src.path(), dst.path(), Depth::Full)).unwrap();
    assert_eq!(loader.acquired(), 2);
    assert_eq!(loader.released(), 2);
    assert_eq!(loader.release_calls(), 2);
}

#[test]
fn test_exclusion_anywhere_in_path() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };
    let request = Request { exclude: vec!["/c/".into()], ..request(src.path(), dst.path(), Depth::Full) };

    let report = run(&ctx, &request).unwrap();
    assert_eq!(report.discovered, 1);
    assert_eq!(files(dst.path()), vec!["a/b/x.hdf5"]);
    assert!(loader.loaded().iter().all(|p| !p.ends_with("y.txm")));
}

#[test]
fn test_dry_run_writes_nothing() {
    let src = tree();
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };
    let request = Request { dry_run: true, ..request(src.path(), dst.path(), Depth::Full) };

    let report = run(&ctx, &request).unwrap();
    let mut outputs: Vec<PathBuf> = report.pending.iter().map(|p| p.output.clone()).collect();
    outputs.sort();
    assert_eq!(outputs, vec![dst.path().join("a/b/x.hdf5"), dst.path().join("a/c/y.hdf5")]);
    assert!(report.converted.is_empty());
    assert!(loader.loaded().is_empty());
    assert!(files(dst.path()).is_empty());
}

#[test]
fn test_fatal_errors_before_processing() {
    let dst = tempfile::tempdir().unwrap();
    let loader = MockLoader::new();
    let writer = MockWriter::new();
    let ctx = Context { loader: &loader, writer: &writer };

    let err = run(&ctx, &Request::new(dst.path().join("missing"), dst.path())).unwrap_err();
    assert!(err.is_fatal());
    assert!(loader.loaded().is_empty());
}
