use std::fs;

use camino::Utf8PathBuf;

use cazy_pipeline::layout::Layout;
use cazy_pipeline::summary::{aggregate_genomes, summarize_overview, write_genome_summary};

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

fn write_overview(genomes_root: &Utf8PathBuf, genome_id: &str, body: &str) {
    let dir = genomes_root.join(genome_id);
    fs::create_dir_all(dir.as_std_path()).unwrap();
    let header = "Gene ID\tHMMER\tHotpep\tDIAMOND\t#ofTools\n";
    fs::write(
        dir.join("overview.txt").as_std_path(),
        format!("{header}{body}"),
    )
    .unwrap();
}

#[test]
fn per_genome_summary_file_is_written_under_the_summary_tree() {
    let (_guard, root) = utf8_tempdir();
    let genomes = root.join("genomes");
    let layout = Layout::new(genomes.clone(), root.join("summary"));
    write_overview(
        &genomes,
        "1314",
        "gene1\tGH13(1-90)\tGH13_1(44)\tGH13_1\t3\n\
         gene2\tGH5(2-80)\tGH5(11)\tGH5\t2\n",
    );

    let summary = summarize_overview(&genomes.join("1314/overview.txt")).unwrap();
    assert_eq!(summary.genome_id, "1314");

    let path = write_genome_summary(&layout, &summary).unwrap();
    assert_eq!(
        path,
        root.join("summary/1314_overview_geneids_cazyids_summary.csv")
    );
    let content = fs::read_to_string(path.as_std_path()).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("Gene ID,CAZy ID,1314"));
    assert_eq!(lines.next(), Some("gene1,GH13_1,1"));
    assert_eq!(lines.next(), Some("gene2,GH5,1"));
}

#[test]
fn disjoint_genomes_combine_into_a_zero_filled_union_matrix() {
    let (_guard, root) = utf8_tempdir();
    let genomes = root.join("genomes");
    let layout = Layout::new(genomes.clone(), root.join("summary"));
    write_overview(&genomes, "100", "g1\tGH1\tGH1(5)\tGH1\t3\n");
    write_overview(&genomes, "200", "g2\tGT2\tGT2(9)\tGT2\t2\n");

    let result = aggregate_genomes(&layout).unwrap();
    assert_eq!(result.genomes, 2);
    assert_eq!(result.families, 2);
    assert_eq!(result.genome_summaries.len(), 2);

    let content = fs::read_to_string(result.combined_path.as_std_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "CAZy ID,100,200");
    assert_eq!(lines[1], "GH1,1,0");
    assert_eq!(lines[2], "GT2,0,1");
}

#[test]
fn empty_overview_reports_are_skipped() {
    let (_guard, root) = utf8_tempdir();
    let genomes = root.join("genomes");
    let layout = Layout::new(genomes.clone(), root.join("summary"));
    write_overview(&genomes, "100", "g1\tGH1\tGH1(5)\tGH1\t3\n");

    let empty_dir = genomes.join("200");
    fs::create_dir_all(empty_dir.as_std_path()).unwrap();
    fs::write(empty_dir.join("overview.txt").as_std_path(), "").unwrap();

    let result = aggregate_genomes(&layout).unwrap();
    assert_eq!(result.genomes, 1);
    let content = fs::read_to_string(result.combined_path.as_std_path()).unwrap();
    assert_eq!(content.lines().next(), Some("CAZy ID,100"));
}

#[test]
fn rows_without_consensus_never_reach_the_matrix() {
    let (_guard, root) = utf8_tempdir();
    let genomes = root.join("genomes");
    let layout = Layout::new(genomes.clone(), root.join("summary"));
    write_overview(
        &genomes,
        "100",
        "g1\tGH1\tGH1(5)\tGH1\t3\n\
         g2\t-\tGH9(2)\t-\t1\n\
         g3\tGT2\t-\tGT2\t2\n",
    );

    let result = aggregate_genomes(&layout).unwrap();
    assert_eq!(result.families, 1);
    let content = fs::read_to_string(result.combined_path.as_std_path()).unwrap();
    assert!(content.contains("GH1,1"));
    assert!(!content.contains("GH9"));
    assert!(!content.contains("GT2"));
}
