use std::fs::{self, File};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::GenomeRecord;
use crate::error::PipelineError;
use crate::exec::{capture_shell_output, find_executable, run_shell_command};
use crate::fs_util;
use crate::layout::Layout;

const GENOMIC_ARCHIVE_SUFFIX: &str = "_genomic.fna.gz";

/// Resolves a genome record to a remote archive location.
pub trait AssemblyResolver {
    fn resolve_archive_url(&self, record: &GenomeRecord) -> Result<String, PipelineError>;
}

/// Resolves through the NCBI E-utilities pipeline on `PATH`.
pub struct EntrezResolver;

impl AssemblyResolver for EntrezResolver {
    fn resolve_archive_url(&self, record: &GenomeRecord) -> Result<String, PipelineError> {
        let cmd = format!(
            "esearch -db assembly -query \"txid{}[Organism] AND {}[BioProject]\" \
             | efetch -format docsum \
             | xtract -pattern DocumentSummary -element FtpPath_GenBank",
            record.tax_id, record.bioproject
        );
        tracing::info!(
            "fetching GenBank ftp path for taxonomy id {}",
            record.tax_id
        );
        let ftp_path = capture_shell_output(&cmd)?;
        let base = ftp_path.rsplit('/').next().unwrap_or("");
        // An empty resolution yields the degenerate "_genomic.fna.gz" name,
        // which routes the record to the fallback downloader.
        Ok(format!("{ftp_path}/{base}{GENOMIC_ARCHIVE_SUFFIX}"))
    }
}

/// Fetches a resolved archive URL into a local file.
pub trait ArchiveFetcher {
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), PipelineError>;
}

pub struct HttpArchiveFetcher {
    client: Client,
}

impl HttpArchiveFetcher {
    pub fn new() -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cazy-pipe/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| PipelineError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    /// NCBI serves the GenBank FTP tree over HTTPS as well.
    fn normalize_url(url: &str) -> String {
        match url.strip_prefix("ftp://") {
            Some(rest) => format!("https://{rest}"),
            None => url.to_string(),
        }
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), PipelineError> {
        let url = Self::normalize_url(url);
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PipelineError::Http(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(PipelineError::HttpStatus { status, message });
        }
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Fallback download path for records whose archive name could not be
/// resolved: the external `ncbi-genome-download` tool with genus and strain
/// parsed from the record's metadata fields.
pub trait GenomeDownloader {
    fn download_assembly(
        &self,
        record: &GenomeRecord,
        out_dir: &Utf8Path,
    ) -> Result<bool, PipelineError>;
}

pub struct NcbiGenomeDownload {
    exe: String,
    logfile: File,
}

impl NcbiGenomeDownload {
    pub fn new(logfile: File) -> Result<Self, PipelineError> {
        let exe = find_executable(&["ncbi-genome-download"], None)?;
        Ok(Self { exe, logfile })
    }
}

impl GenomeDownloader for NcbiGenomeDownload {
    fn download_assembly(
        &self,
        record: &GenomeRecord,
        out_dir: &Utf8Path,
    ) -> Result<bool, PipelineError> {
        let genus = record.genus().unwrap_or(&record.species);
        let strain = record
            .strain()
            .unwrap_or_else(|| record.cleaned_scientific_name());
        let cmd = format!(
            "{} --section genbank --formats \"fasta\" --assembly-levels \"all\" \
             --genera \"{genus}\" --strains \"{strain}\" --taxids {} \
             --output-folder {out_dir} --flat-output -v bacteria",
            self.exe, record.tax_id
        );
        tracing::info!(
            "fetching GenBank genome assembly for taxid {}",
            record.tax_id
        );
        run_shell_command(&cmd, &self.logfile, false, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAction {
    Downloaded,
    Fallback,
    Skipped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub tax_id: String,
    pub action: FetchAction,
}

#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub items: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn count(&self, action: FetchAction) -> usize {
        self.items
            .iter()
            .filter(|item| item.action == action)
            .count()
    }
}

/// True for a well-formed `<assembly>_genomic.fna.gz` archive name.
pub fn is_genomic_archive(name: &str) -> bool {
    name.ends_with(GENOMIC_ARCHIVE_SUFFIX) && name != GENOMIC_ARCHIVE_SUFFIX
}

/// Downloads every record's genome into `genomes/<tax_id>/`, decompressing
/// in place. Failures are logged per record and the remaining records are
/// still processed; nothing is retried.
pub fn fetch_genomes<R, F, D>(
    records: &[GenomeRecord],
    resolver: &R,
    fetcher: &F,
    downloader: &D,
    layout: &Layout,
) -> Result<FetchReport, PipelineError>
where
    R: AssemblyResolver,
    F: ArchiveFetcher,
    D: GenomeDownloader,
{
    let mut report = FetchReport::default();
    for record in records {
        let action = fetch_one(record, resolver, fetcher, downloader, layout)?;
        report.items.push(FetchOutcome {
            tax_id: record.tax_id.to_string(),
            action,
        });
    }
    Ok(report)
}

fn fetch_one<R, F, D>(
    record: &GenomeRecord,
    resolver: &R,
    fetcher: &F,
    downloader: &D,
    layout: &Layout,
) -> Result<FetchAction, PipelineError>
where
    R: AssemblyResolver,
    F: ArchiveFetcher,
    D: GenomeDownloader,
{
    let url = match resolver.resolve_archive_url(record) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(
                "error occurred when fetching genome accession for taxid {}: {err}",
                record.tax_id
            );
            return Ok(FetchAction::Failed);
        }
    };

    let out_dir = layout.ensure_genome_dir(record.tax_id)?;
    let archive_name = url.rsplit('/').next().unwrap_or("");

    if !is_genomic_archive(archive_name) {
        return fallback_download(record, downloader, &out_dir);
    }

    let archive = out_dir.join(archive_name);
    let unzipped = archive.with_extension("");
    if unzipped.is_file() {
        tracing::info!("unzipped file {unzipped} exists");
        return Ok(FetchAction::Skipped);
    }

    tracing::info!("fetching sequence file {url}");
    if let Err(err) = fetcher.download(&url, &archive) {
        tracing::warn!(
            "error occurred when fetching genome accession for taxid {}: {err}",
            record.tax_id
        );
        return Ok(FetchAction::Failed);
    }
    let _ = fs_util::uncompress_fasta(&archive, ".fna");
    Ok(FetchAction::Downloaded)
}

fn fallback_download<D: GenomeDownloader>(
    record: &GenomeRecord,
    downloader: &D,
    out_dir: &Utf8Path,
) -> Result<FetchAction, PipelineError> {
    match downloader.download_assembly(record, out_dir) {
        Ok(true) => {
            for archive in gz_files(out_dir)? {
                let _ = fs_util::uncompress_fasta(&archive, ".fna");
            }
            Ok(FetchAction::Fallback)
        }
        Ok(false) => Ok(FetchAction::Failed),
        Err(err) => {
            tracing::warn!(
                "error occurred when fetching genome assembly for taxid {}: {err}",
                record.tax_id
            );
            Ok(FetchAction::Failed)
        }
    }
}

fn gz_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("read {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| PipelineError::Filesystem(format!("non-UTF-8 path: {path:?}")))?;
        if path.is_file() && path.extension() == Some("gz") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genomic_archive_names() {
        assert!(is_genomic_archive(
            "GCA_000013285.1_ASM1328v1_genomic.fna.gz"
        ));
        assert!(!is_genomic_archive("_genomic.fna.gz"));
        assert!(!is_genomic_archive("GCA_000013285.1.zip"));
    }

    #[test]
    fn ftp_urls_rewritten_to_https() {
        assert_eq!(
            HttpArchiveFetcher::normalize_url("ftp://ftp.ncbi.nlm.nih.gov/genomes/x"),
            "https://ftp.ncbi.nlm.nih.gov/genomes/x"
        );
        assert_eq!(
            HttpArchiveFetcher::normalize_url("https://example.org/x"),
            "https://example.org/x"
        );
    }
}
