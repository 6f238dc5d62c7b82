use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use cazy_pipeline::annotate::{
    AnnotateAction, AnnotateOptions, AnnotationJob, Annotator, annotate_directory,
    validate_data_dir,
};
use cazy_pipeline::domain::{SeqType, ToolSelection};
use cazy_pipeline::error::PipelineError;
use cazy_pipeline::layout::EXPECTED_OUTPUTS;

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

fn options() -> AnnotateOptions {
    AnnotateOptions {
        seq_type: SeqType::Prok,
        tools: ToolSelection::all(),
        db_dir: Utf8PathBuf::from("/db"),
        extra_args: String::new(),
    }
}

/// Records every invocation and writes the three expected outputs, the way
/// a successful dbCAN run would.
#[derive(Default)]
struct RecordingAnnotator {
    invocations: Mutex<Vec<Utf8PathBuf>>,
}

impl Annotator for RecordingAnnotator {
    fn annotate(
        &self,
        job: &AnnotationJob,
        _options: &AnnotateOptions,
    ) -> Result<bool, PipelineError> {
        self.invocations
            .lock()
            .unwrap()
            .push(job.input_file.clone());
        for name in EXPECTED_OUTPUTS {
            fs::write(job.out_dir.join(name).as_std_path(), "").unwrap();
        }
        Ok(true)
    }
}

struct FailingAnnotator;

impl Annotator for FailingAnnotator {
    fn annotate(
        &self,
        _job: &AnnotationJob,
        _options: &AnnotateOptions,
    ) -> Result<bool, PipelineError> {
        Ok(false)
    }
}

fn genome_tree(root: &Utf8PathBuf, tax_ids: &[&str]) {
    for tax_id in tax_ids {
        let dir = root.join(tax_id);
        fs::create_dir_all(dir.as_std_path()).unwrap();
        fs::write(
            dir.join(format!("genome_{tax_id}.fna")).as_std_path(),
            ">seq\nACGT\n",
        )
        .unwrap();
    }
}

#[test]
fn every_sequence_file_is_annotated_once() {
    let (_guard, root) = utf8_tempdir();
    genome_tree(&root, &["1314", "562"]);

    let annotator = RecordingAnnotator::default();
    let outcomes = annotate_directory(&annotator, &root, &options()).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.action == AnnotateAction::Annotated)
    );
    assert_eq!(annotator.invocations.lock().unwrap().len(), 2);
}

#[test]
fn second_run_makes_zero_tool_invocations() {
    let (_guard, root) = utf8_tempdir();
    genome_tree(&root, &["1314", "562"]);

    let annotator = RecordingAnnotator::default();
    annotate_directory(&annotator, &root, &options()).unwrap();
    assert_eq!(annotator.invocations.lock().unwrap().len(), 2);

    let outcomes = annotate_directory(&annotator, &root, &options()).unwrap();
    assert_eq!(annotator.invocations.lock().unwrap().len(), 2);
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.action == AnnotateAction::Skipped)
    );
}

#[test]
fn partial_outputs_do_not_trigger_a_skip() {
    let (_guard, root) = utf8_tempdir();
    genome_tree(&root, &["1314"]);
    // two of three outputs present: still re-annotated
    fs::write(root.join("1314/diamond.out").as_std_path(), "").unwrap();
    fs::write(root.join("1314/hmmer.out").as_std_path(), "").unwrap();

    let annotator = RecordingAnnotator::default();
    let outcomes = annotate_directory(&annotator, &root, &options()).unwrap();
    assert_eq!(outcomes[0].action, AnnotateAction::Annotated);
}

#[test]
fn tool_failures_are_reported_not_raised() {
    let (_guard, root) = utf8_tempdir();
    genome_tree(&root, &["1314", "562"]);

    let outcomes = annotate_directory(&FailingAnnotator, &root, &options()).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.action == AnnotateAction::Failed)
    );
}

#[test]
fn non_sequence_files_are_ignored() {
    let (_guard, root) = utf8_tempdir();
    genome_tree(&root, &["1314"]);
    fs::write(root.join("1314/notes.txt").as_std_path(), "x").unwrap();

    let annotator = RecordingAnnotator::default();
    let outcomes = annotate_directory(&annotator, &root, &options()).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].input_file.as_str().ends_with("genome_1314.fna"));
}

#[test]
fn validate_rejects_missing_empty_and_non_directories() {
    let (_guard, root) = utf8_tempdir();

    let missing = root.join("nope");
    assert_matches!(
        validate_data_dir(&missing),
        Err(PipelineError::NotADirectory(_))
    );

    let empty = root.join("empty");
    fs::create_dir_all(empty.as_std_path()).unwrap();
    assert_matches!(
        validate_data_dir(&empty),
        Err(PipelineError::EmptyDirectory(_))
    );

    let file = root.join("plain.fna");
    fs::write(file.as_std_path(), ">a\n").unwrap();
    assert_matches!(
        validate_data_dir(&file),
        Err(PipelineError::NotADirectory(_))
    );

    genome_tree(&root, &["1314"]);
    assert!(validate_data_dir(&root).is_ok());
}
