//! Croatian archival metadata schema
//!
//! The streaming core treats records as opaque; this table is only consulted
//! by prompt construction, table rendering and CSV export.

/// Description of one archival field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key emitted by the model
    pub key: &'static str,
    /// Column header used in exports
    pub header: &'static str,
    /// Short description given to the model
    pub description: &'static str,
}

/// All archival fields, in export column order
pub const ARCHIVAL_FIELDS: [FieldSpec; 22] = [
    FieldSpec { key: "identifikator", header: "Identifikator", description: "Unique identifier, e.g., HR-DAVŽ-69" },
    FieldSpec { key: "naslov", header: "Naslov", description: "Title or name of the archival record" },
    FieldSpec { key: "razina", header: "Razina", description: "Level: Fond, serija, podserija, or komad" },
    FieldSpec { key: "visaID", header: "VisaID", description: "Higher level ID reference" },
    FieldSpec { key: "redoslijed", header: "Redoslijed", description: "Order or sequence number" },
    FieldSpec { key: "vrijemeOd", header: "VrijemeOd", description: "Start date/year" },
    FieldSpec { key: "vrijemeDo", header: "VrijemeDo", description: "End date/year" },
    FieldSpec { key: "sadrzaj", header: "Sadrzaj", description: "Content description" },
    FieldSpec { key: "napomena", header: "Napomena", description: "Notes or remarks" },
    FieldSpec { key: "kolicina", header: "Količina", description: "Quantity, e.g., 19 knjiga" },
    FieldSpec { key: "brojTehnickeJedinice", header: "Broj tehničke jedinice", description: "Technical unit number, e.g., kut. br. 2" },
    FieldSpec { key: "jezik1", header: "Jezik1", description: "Primary language" },
    FieldSpec { key: "jezik2", header: "Jezik2", description: "Secondary language" },
    FieldSpec { key: "pismo1", header: "Pismo1", description: "Primary script" },
    FieldSpec { key: "pismo2", header: "Pismo2", description: "Secondary script" },
    FieldSpec { key: "vrstaGradje", header: "VrstaGradje", description: "Type of material" },
    FieldSpec { key: "vrstaZapisa", header: "VrstaZapisa", description: "Type of record" },
    FieldSpec { key: "vrstaSadrzaja", header: "VrstaSadrzaja", description: "Type of content" },
    FieldSpec { key: "institucija", header: "Institucija", description: "Institution code" },
    FieldSpec { key: "statusZapisa", header: "StatusZapisa", description: "Record status" },
    FieldSpec { key: "zaObjavu", header: "ZaObjavu", description: "Publication status" },
    FieldSpec { key: "uvjetiKoristenja", header: "Uvjeti koristenja", description: "Terms of use URL" },
];

/// Look up a field by its JSON key
pub fn field(key: &str) -> Option<&'static FieldSpec> {
    ARCHIVAL_FIELDS.iter().find(|f| f.key == key)
}
