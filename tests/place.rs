use std::fs;

use camino::Utf8PathBuf;

use cazy_pipeline::place::place_genomes;

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

#[test]
fn files_land_in_per_tax_id_subdirectories() {
    let (_guard, root) = utf8_tempdir();
    let data_dir = root.join("missing_genomes");
    let genomes_dir = root.join("genomes");
    fs::create_dir_all(data_dir.as_std_path()).unwrap();
    fs::write(data_dir.join("genome_1314.fna").as_std_path(), ">a\n").unwrap();
    fs::write(data_dir.join("genome_562.fna").as_std_path(), ">b\n").unwrap();

    let report = place_genomes(&data_dir, &genomes_dir).unwrap();
    assert_eq!(report.copied.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(
        fs::read_to_string(genomes_dir.join("1314/genome_1314.fna").as_std_path()).unwrap(),
        ">a\n"
    );
    assert!(genomes_dir.join("562/genome_562.fna").is_file());
}

#[test]
fn rerun_overwrites_existing_copies() {
    let (_guard, root) = utf8_tempdir();
    let data_dir = root.join("data");
    let genomes_dir = root.join("genomes");
    fs::create_dir_all(data_dir.as_std_path()).unwrap();
    let source = data_dir.join("genome_1314.fna");
    fs::write(source.as_std_path(), ">v1\n").unwrap();

    place_genomes(&data_dir, &genomes_dir).unwrap();
    fs::write(source.as_std_path(), ">v2\n").unwrap();
    place_genomes(&data_dir, &genomes_dir).unwrap();

    assert_eq!(
        fs::read_to_string(genomes_dir.join("1314/genome_1314.fna").as_std_path()).unwrap(),
        ">v2\n"
    );
}

#[test]
fn files_without_tax_id_are_skipped() {
    let (_guard, root) = utf8_tempdir();
    let data_dir = root.join("data");
    let genomes_dir = root.join("genomes");
    fs::create_dir_all(data_dir.as_std_path()).unwrap();
    fs::write(data_dir.join("README.txt").as_std_path(), "notes").unwrap();
    fs::write(data_dir.join("genome_1314.fna").as_std_path(), ">a\n").unwrap();

    let report = place_genomes(&data_dir, &genomes_dir).unwrap();
    assert_eq!(report.copied.len(), 1);
    assert_eq!(report.skipped.len(), 1);
}
