use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Organization credited when the form is opened without a signed link.
pub const DEFAULT_ORGANIZATION: &str = "Instituto Wedja de Socionomia";

/// Column header of the destination worksheet, in cell order.
pub const SHEET_COLUMNS: [&str; 11] = [
    "Timestamp",
    "ID_FORMULARIO",
    "NOME_COMPLETO",
    "DATA_NASC",
    "CONTATO",
    "AREA_EMPRESA",
    "FUNCAO",
    "VORTICE",
    "PRIORIDADE",
    "FRACTAL_COMPORTAMENTO",
    "JUSTIFICATIVA",
];

/// Raw `org`/`exp`/`sig` query parameters of an access link.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkQuery {
    pub org: Option<String>,
    pub exp: Option<String>,
    pub sig: Option<String>,
}

impl LinkQuery {
    /// Builds the link from raw query pairs. A repeated parameter keeps its last value,
    /// and unknown parameters are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        pairs.into_iter().fold(Self::default(), |mut link, (key, value)| {
            match key.as_str() {
                "org" => link.org = Some(value),
                "exp" => link.exp = Some(value),
                "sig" => link.sig = Some(value),
                _ => {}
            }
            link
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// No link parameters at all.
    Open,
    Signed,
    /// Some but not all of org/exp/sig present.
    Partial,
    Tampered,
    Expired,
    Malformed,
}

impl LinkStatus {
    pub fn message(self) -> &'static str {
        match self {
            LinkStatus::Open | LinkStatus::Signed => "Link válido.",
            LinkStatus::Partial | LinkStatus::Malformed => "Link inválido.",
            LinkStatus::Tampered => "Link inválido ou adulterado.",
            LinkStatus::Expired => "Link Expirado.",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkDecision {
    pub valid: bool,
    pub organization: String,
    pub status: LinkStatus,
}

impl LinkDecision {
    pub fn open() -> Self {
        Self {
            valid: true,
            organization: DEFAULT_ORGANIZATION.to_string(),
            status: LinkStatus::Open,
        }
    }

    pub fn rejected(status: LinkStatus) -> Self {
        Self {
            valid: false,
            organization: DEFAULT_ORGANIZATION.to_string(),
            status,
        }
    }
}

/// The three fixed vórtices, always in this order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "Consigo")]
    Consigo,
    #[serde(rename = "Com o Outro")]
    ComOOutro,
    #[serde(rename = "Com o Todo")]
    ComOTodo,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Consigo, Category::ComOOutro, Category::ComOTodo];

    pub fn label(self) -> &'static str {
        match self {
            Category::Consigo => "Consigo",
            Category::ComOOutro => "Com o Outro",
            Category::ComOTodo => "Com o Todo",
        }
    }
}

/// Fractal / comportamento-alvo picked for a vórtice.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetCategory {
    #[default]
    #[serde(rename = "Selecione...")]
    Unselected,
    #[serde(rename = "Físico")]
    Fisico,
    #[serde(rename = "Financeiro")]
    Financeiro,
    #[serde(rename = "Parentais")]
    Parentais,
    #[serde(rename = "Amigos")]
    Amigos,
    #[serde(rename = "Linhagem Familiar")]
    LinhagemFamiliar,
    #[serde(rename = "Processos de Vida")]
    ProcessosDeVida,
    #[serde(rename = "Espiritual")]
    Espiritual,
    #[serde(rename = "Profissional")]
    Profissional,
    #[serde(rename = "Conjugais")]
    Conjugais,
    #[serde(rename = "Subordinados")]
    Subordinados,
    #[serde(rename = "Social")]
    Social,
    #[serde(rename = "Princípios Éticos")]
    PrincipiosEticos,
    #[serde(rename = "Sentimento")]
    Sentimento,
    #[serde(rename = "Intelectual")]
    Intelectual,
    #[serde(rename = "Filhos")]
    Filhos,
    #[serde(rename = "Parceiros")]
    Parceiros,
    #[serde(rename = "Institucional")]
    Institucional,
    #[serde(rename = "Finitude")]
    Finitude,
}

impl TargetCategory {
    /// Sentinel first, then the 18 domains in display order.
    pub const ALL: [TargetCategory; 19] = [
        TargetCategory::Unselected,
        TargetCategory::Fisico,
        TargetCategory::Financeiro,
        TargetCategory::Parentais,
        TargetCategory::Amigos,
        TargetCategory::LinhagemFamiliar,
        TargetCategory::ProcessosDeVida,
        TargetCategory::Espiritual,
        TargetCategory::Profissional,
        TargetCategory::Conjugais,
        TargetCategory::Subordinados,
        TargetCategory::Social,
        TargetCategory::PrincipiosEticos,
        TargetCategory::Sentimento,
        TargetCategory::Intelectual,
        TargetCategory::Filhos,
        TargetCategory::Parceiros,
        TargetCategory::Institucional,
        TargetCategory::Finitude,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TargetCategory::Unselected => "Selecione...",
            TargetCategory::Fisico => "Físico",
            TargetCategory::Financeiro => "Financeiro",
            TargetCategory::Parentais => "Parentais",
            TargetCategory::Amigos => "Amigos",
            TargetCategory::LinhagemFamiliar => "Linhagem Familiar",
            TargetCategory::ProcessosDeVida => "Processos de Vida",
            TargetCategory::Espiritual => "Espiritual",
            TargetCategory::Profissional => "Profissional",
            TargetCategory::Conjugais => "Conjugais",
            TargetCategory::Subordinados => "Subordinados",
            TargetCategory::Social => "Social",
            TargetCategory::PrincipiosEticos => "Princípios Éticos",
            TargetCategory::Sentimento => "Sentimento",
            TargetCategory::Intelectual => "Intelectual",
            TargetCategory::Filhos => "Filhos",
            TargetCategory::Parceiros => "Parceiros",
            TargetCategory::Institucional => "Institucional",
            TargetCategory::Finitude => "Finitude",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|target| target.label() == label)
            .ok_or_else(|| ValidationError::UnknownTargetCategory(label.to_string()))
    }

    pub fn is_selected(self) -> bool {
        self != TargetCategory::Unselected
    }
}

/// Priority rank of a vórtice, always within 1..=3.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Priority {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Priority(value as u8)),
            _ => Err(ValidationError::PriorityOutOfRange(value)),
        }
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        i64::from(priority.0)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub category: Category,
    pub priority: Priority,
    pub target: TargetCategory,
    #[serde(default)]
    pub justification: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Respondent {
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub contact: String,
    pub area_or_company: String,
    pub role: String,
    /// Collecting organization, taken from the access link.
    pub organization: String,
}

/// Accepts birth dates between 1900-01-01 and `today`, inclusive.
pub fn check_birth_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    if date < earliest || date > today {
        return Err(ValidationError::BirthDateOutOfRange(date));
    }
    Ok(date)
}

/// One worksheet row; field order matches [`SHEET_COLUMNS`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub timestamp: String,
    pub organization_id: String,
    pub full_name: String,
    pub birth_date: String,
    pub contact: String,
    pub area_or_company: String,
    pub role: String,
    pub category: String,
    pub priority: u8,
    pub target: String,
    pub justification: String,
}

impl SheetRow {
    /// Cell values as sent to the sheet. Priority stays numeric.
    pub fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.timestamp.as_str()),
            Value::from(self.organization_id.as_str()),
            Value::from(self.full_name.as_str()),
            Value::from(self.birth_date.as_str()),
            Value::from(self.contact.as_str()),
            Value::from(self.area_or_company.as_str()),
            Value::from(self.role.as_str()),
            Value::from(self.category.as_str()),
            Value::from(self.priority),
            Value::from(self.target.as_str()),
            Value::from(self.justification.as_str()),
        ]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmissionBatch {
    pub timestamp: String,
    pub organization_id: String,
    pub rows: Vec<SheetRow>,
}
