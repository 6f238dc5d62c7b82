use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::Deserialize;

use crate::domain::{GenomeRecord, TaxId};
use crate::error::PipelineError;

/// Raw row of the "Taxa_metadata" table (CSV export of the worksheet; the
/// column headers are kept as-is).
#[derive(Debug, Deserialize)]
struct TaxaRow {
    #[serde(rename = "Tax_ID")]
    tax_id: String,
    #[serde(rename = "Species")]
    species: String,
    #[serde(rename = "BioProject Accession")]
    bioproject: String,
    #[serde(rename = "Scientific_Name")]
    scientific_name: String,
}

/// Reads the taxa metadata table into one record per distinct taxonomy id.
/// A tax id appearing on several rows keeps the last row.
pub fn read_taxa_metadata(path: &Utf8Path) -> Result<Vec<GenomeRecord>, PipelineError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| PipelineError::MetadataRead(path.as_std_path().to_path_buf()))?;
    parse_taxa_metadata(&content)
}

pub fn parse_taxa_metadata(content: &str) -> Result<Vec<GenomeRecord>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records: BTreeMap<TaxId, GenomeRecord> = BTreeMap::new();
    for row in reader.deserialize() {
        let row: TaxaRow = row.map_err(|err| PipelineError::MetadataParse(err.to_string()))?;
        let tax_id: TaxId = row.tax_id.parse()?;
        records.insert(
            tax_id,
            GenomeRecord {
                tax_id,
                species: row.species,
                bioproject: row.bioproject,
                scientific_name: row.scientific_name,
            },
        );
    }
    Ok(records.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Tax_ID,Species,BioProject Accession,Scientific_Name
1314,Streptococcus pyogenes,PRJNA278886,Streptococcus pyogenes NGAS638
562,Escherichia coli,PRJNA225,Escherichia coli K-12
";

    #[test]
    fn parse_rows() {
        let records = parse_taxa_metadata(TABLE).unwrap();
        assert_eq!(records.len(), 2);
        // BTreeMap orders by tax id.
        assert_eq!(records[0].tax_id.value(), 562);
        assert_eq!(records[1].species, "Streptococcus pyogenes");
        assert_eq!(records[1].bioproject, "PRJNA278886");
    }

    #[test]
    fn duplicate_tax_id_keeps_last_row() {
        let table = "\
Tax_ID,Species,BioProject Accession,Scientific_Name
562,Escherichia coli,PRJNA225,Escherichia coli K-12
562,Escherichia coli,PRJNA999,Escherichia coli O157:H7
";
        let records = parse_taxa_metadata(table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bioproject, "PRJNA999");
    }

    #[test]
    fn bad_tax_id_is_an_error() {
        let table = "\
Tax_ID,Species,BioProject Accession,Scientific_Name
not-a-taxid,Escherichia coli,PRJNA225,Escherichia coli K-12
";
        assert!(parse_taxa_metadata(table).is_err());
    }
}
