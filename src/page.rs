//! The form page: state carried by the HTML form and its server-side rendering.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::models::{
    check_birth_date, Category, CategoryRow, LinkDecision, LinkQuery, Priority, Respondent,
    SubmissionBatch, TargetCategory,
};

const COLOR_PRIMARY: &str = "#70D1C6";
const COLOR_TEXT_DARK: &str = "#333333";

/// Everything the browser posts back, exactly as typed.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct FormSubmission {
    pub org: String,
    pub exp: String,
    pub sig: String,
    pub full_name: String,
    pub birth_date: String,
    pub contact: String,
    pub area_or_company: String,
    pub role: String,
    pub priority_0: String,
    pub target_0: String,
    pub justification_0: String,
    pub priority_1: String,
    pub target_1: String,
    pub justification_1: String,
    pub priority_2: String,
    pub target_2: String,
    pub justification_2: String,
}

impl FormSubmission {
    /// Blank form for the given link, priorities preset to 1 as the number inputs start.
    pub fn blank(link: &LinkQuery) -> Self {
        Self {
            org: link.org.clone().unwrap_or_default(),
            exp: link.exp.clone().unwrap_or_default(),
            sig: link.sig.clone().unwrap_or_default(),
            priority_0: "1".to_string(),
            priority_1: "1".to_string(),
            priority_2: "1".to_string(),
            ..Self::default()
        }
    }

    pub fn link(&self) -> LinkQuery {
        let field = |v: &String| Some(v.clone()).filter(|v| !v.is_empty());
        LinkQuery {
            org: field(&self.org),
            exp: field(&self.exp),
            sig: field(&self.sig),
        }
    }

    fn row_fields(&self) -> [(&str, &str, &str); 3] {
        [
            (self.priority_0.as_str(), self.target_0.as_str(), self.justification_0.as_str()),
            (self.priority_1.as_str(), self.target_1.as_str(), self.justification_1.as_str()),
            (self.priority_2.as_str(), self.target_2.as_str(), self.justification_2.as_str()),
        ]
    }

    /// Turns typed-in values into the respondent and its three rows.
    pub fn parse(
        &self,
        organization: &str,
        today: NaiveDate,
    ) -> Result<(Respondent, [CategoryRow; 3]), ValidationError> {
        let birth_date = NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidBirthDate(self.birth_date.clone()))?;
        let birth_date = check_birth_date(birth_date, today)?;

        let respondent = Respondent {
            full_name: self.full_name.trim().to_string(),
            birth_date,
            contact: self.contact.trim().to_string(),
            area_or_company: self.area_or_company.trim().to_string(),
            role: self.role.trim().to_string(),
            organization: organization.to_string(),
        };

        let [first, second, third] = self.row_fields();
        let rows = [
            parse_row(Category::Consigo, first)?,
            parse_row(Category::ComOOutro, second)?,
            parse_row(Category::ComOTodo, third)?,
        ];
        Ok((respondent, rows))
    }
}

fn parse_row(
    category: Category,
    (priority, target, justification): (&str, &str, &str),
) -> Result<CategoryRow, ValidationError> {
    let priority = priority
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidPriority(priority.to_string()))?;
    let target = if target.is_empty() {
        TargetCategory::Unselected
    } else {
        TargetCategory::from_label(target)?
    };
    Ok(CategoryRow {
        category,
        priority: Priority::try_from(priority)?,
        target,
        justification: justification.trim().to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Formulário - Vórtices e Fractais</title>
<style>
body {{ font-family: sans-serif; color: {COLOR_TEXT_DARK}; background: #FFFFFF; max-width: 960px; margin: 0 auto; padding: 1rem; }}
header {{ border-bottom: 5px solid {COLOR_TEXT_DARK}; background: {COLOR_PRIMARY}; padding: 1rem; }}
fieldset {{ background: #f0f2f6; border: none; border-left: 5px solid {COLOR_PRIMARY}; border-radius: 5px; padding: 1.5rem; margin: 1rem 0 1.5rem; }}
label {{ display: block; font-weight: 600; margin-top: .75rem; }}
input, select {{ border: 1px solid #cccccc; border-radius: 5px; padding: .4rem; width: 100%; box-sizing: border-box; }}
.notice {{ padding: .75rem 1rem; border-radius: 5px; margin: 1rem 0; }}
.warning {{ background: #fff4d6; }}
.error {{ background: #fde2e1; }}
.success {{ background: #dff5ee; }}
button {{ background: {COLOR_PRIMARY}; color: white; font-weight: bold; padding: .75rem 1.5rem; border-radius: 8px; border: none; }}
</style>
</head>
<body>
<header><h1>FORMULÁRIO 2 - VÓRTICES E FRACTAIS PRIORITÁRIOS</h1></header>
{body}
</body>
</html>
"#
    )
}

fn notice_html(notice: &Notice) -> String {
    let class = match notice.kind {
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    };
    format!(r#"<div class="notice {class}">{}</div>"#, escape(&notice.text))
}

fn text_input(out: &mut String, label: &str, name: &str, value: &str) {
    let _ = write!(
        out,
        r#"<label for="{name}">{label}</label><input type="text" id="{name}" name="{name}" value="{}">"#,
        escape(value)
    );
}

/// Renders the whole form. An invalid link gets the identification block and a block
/// notice only.
pub fn render_form(
    decision: &LinkDecision,
    form: &FormSubmission,
    notice: Option<&Notice>,
    today: NaiveDate,
) -> String {
    let mut body = String::new();

    body.push_str(r#"<form method="post" action="/">"#);
    for (name, value) in [("org", &form.org), ("exp", &form.exp), ("sig", &form.sig)] {
        let _ = write!(body, r#"<input type="hidden" name="{name}" value="{}">"#, escape(value));
    }

    body.push_str(r#"<fieldset><h3 style="text-align:center">Identificação</h3>"#);
    if !decision.valid {
        body.push_str(&notice_html(&Notice::error(decision.status.message())));
    }
    text_input(&mut body, "Nome Completo:", "full_name", &form.full_name);
    let _ = write!(
        body,
        r#"<label for="birth_date">Data de Nascimento:</label><input type="date" id="birth_date" name="birth_date" min="1900-01-01" max="{}" value="{}">"#,
        today.format("%Y-%m-%d"),
        escape(&form.birth_date)
    );
    text_input(&mut body, "Contato (Email/Telefone):", "contact", &form.contact);
    text_input(&mut body, "Área/Empresa:", "area_or_company", &form.area_or_company);
    text_input(&mut body, "Função/Cargo:", "role", &form.role);
    let _ = write!(
        body,
        r#"<label>Organização Coletora:</label><input type="text" value="{}" disabled>"#,
        escape(&decision.organization)
    );
    body.push_str("</fieldset>");

    if !decision.valid {
        body.push_str(&notice_html(&Notice::error("Acesso bloqueado.")));
        body.push_str("</form>");
        return layout(&body);
    }

    body.push_str(concat!(
        r#"<div class="notice">"#,
        "<ul><li>Preencha a tabela abaixo indicando a prioridade e a justificativa para cada Vórtice.</li>",
        "<li><b>Prioridade:</b> Use valores de 1 a 3.</li>",
        "<li><b>Fractal/Comportamento-Alvo:</b> Selecione a área correspondente.</li></ul></div>",
        "<h2>Quadro de Registro</h2>"
    ));

    for (i, (category, (priority, target, justification))) in
        Category::ALL.iter().zip(form.row_fields()).enumerate()
    {
        let _ = write!(
            body,
            r#"<fieldset><h4>Vórtice: {}</h4><label for="priority_{i}">Prioridade (1-3)</label><input type="number" id="priority_{i}" name="priority_{i}" min="1" max="3" step="1" value="{}"><label for="target_{i}">Fractal / Comportamento-Alvo</label><select id="target_{i}" name="target_{i}">"#,
            category.label(),
            escape(priority)
        );
        for option in TargetCategory::ALL {
            let label = option.label();
            let selected = if label == target { " selected" } else { "" };
            let _ = write!(body, r#"<option value="{0}"{selected}>{0}</option>"#, escape(label));
        }
        body.push_str("</select>");
        text_input(&mut body, "Justificativa", &format!("justification_{i}"), justification);
        body.push_str("</fieldset>");
    }

    if let Some(notice) = notice {
        body.push_str(&notice_html(notice));
    }
    body.push_str(r#"<button type="submit">Finalizar e Enviar Respostas</button></form>"#);
    layout(&body)
}

pub fn render_success(batch: &SubmissionBatch) -> String {
    let body = format!(
        r#"<div class="notice success">Formulário enviado com sucesso! ({} registros, ID {})</div>"#,
        batch.rows.len(),
        escape(&batch.organization_id)
    );
    layout(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn filled() -> FormSubmission {
        FormSubmission {
            full_name: " João ".to_string(),
            birth_date: "1990-05-20".to_string(),
            contact: "joao@example.com".to_string(),
            area_or_company: "Vendas".to_string(),
            role: "Gerente".to_string(),
            priority_0: "2".to_string(),
            target_0: "Físico".to_string(),
            justification_0: "a".to_string(),
            priority_1: "1".to_string(),
            target_1: "Social".to_string(),
            justification_1: "b".to_string(),
            priority_2: "3".to_string(),
            target_2: "Espiritual".to_string(),
            justification_2: "c".to_string(),
            ..FormSubmission::default()
        }
    }

    #[test]
    fn test_parse_filled_form() {
        let (respondent, rows) = filled().parse("Acme", today()).unwrap();
        assert_eq!(respondent.full_name, "João");
        assert_eq!(respondent.organization, "Acme");
        assert_eq!(respondent.birth_date, NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
        assert_eq!(rows[0].category, Category::Consigo);
        assert_eq!(rows[0].priority.get(), 2);
        assert_eq!(rows[1].target, TargetCategory::Social);
        assert_eq!(rows[2].justification, "c");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let mut form = filled();
        form.birth_date = "20/05/1990".to_string();
        assert!(matches!(form.parse("Acme", today()), Err(ValidationError::InvalidBirthDate(_))));

        let mut form = filled();
        form.birth_date = "2030-01-01".to_string();
        assert!(matches!(form.parse("Acme", today()), Err(ValidationError::BirthDateOutOfRange(_))));

        let mut form = filled();
        form.priority_1 = "7".to_string();
        assert_eq!(form.parse("Acme", today()).err(), Some(ValidationError::PriorityOutOfRange(7)));

        let mut form = filled();
        form.target_2 = "Outro".to_string();
        assert!(matches!(form.parse("Acme", today()), Err(ValidationError::UnknownTargetCategory(_))));
    }

    #[test]
    fn test_blank_or_non_numeric_priority_rejected() {
        for raw in ["", "  ", "dois", "1.5"] {
            let mut form = filled();
            form.priority_0 = raw.to_string();
            assert_eq!(
                form.parse("Acme", today()).err(),
                Some(ValidationError::InvalidPriority(raw.to_string())),
                "priority {raw:?}"
            );
        }
    }

    #[test]
    fn test_typed_priority_is_kept_on_rerender() {
        let mut form = filled();
        form.priority_2 = "\"><b>".to_string();
        let html = render_form(&LinkDecision::open(), &form, None, today());
        assert!(html.contains(r#"value="&quot;&gt;&lt;b&gt;""#));
        assert!(!html.contains("<b>\""));
    }

    #[test]
    fn test_empty_target_is_unselected() {
        let mut form = filled();
        form.target_0.clear();
        let (_, rows) = form.parse("Acme", today()).unwrap();
        assert_eq!(rows[0].target, TargetCategory::Unselected);
    }

    #[test]
    fn test_blocked_page_has_no_table() {
        let decision = LinkDecision::rejected(LinkStatus::Expired);
        let html = render_form(&decision, &FormSubmission::default(), None, today());
        assert!(html.contains("Link Expirado."));
        assert!(html.contains("Acesso bloqueado."));
        assert!(!html.contains("Quadro de Registro"));
        assert!(!html.contains("<button"));
    }

    #[test]
    fn test_open_page_renders_table_and_escapes() {
        let mut form = FormSubmission::blank(&LinkQuery::default());
        form.full_name = "<script>".to_string();
        let html = render_form(&LinkDecision::open(), &form, Some(&Notice::warning("cuidado")), today());
        assert!(html.contains("Vórtice: Consigo"));
        assert!(html.contains("Vórtice: Com o Todo"));
        assert!(html.contains("Instituto Wedja de Socionomia"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("cuidado"));
        assert_eq!(html.matches("<select").count(), 3);
    }

    #[test]
    fn test_link_roundtrips_through_hidden_fields() {
        let link = LinkQuery {
            org: Some("Acme".to_string()),
            exp: Some("123".to_string()),
            sig: Some("ab".to_string()),
        };
        assert_eq!(FormSubmission::blank(&link).link(), link);
        assert_eq!(FormSubmission::default().link(), LinkQuery::default());
    }
}
