//! Project creation: number, folder tree, database record.

use tracing::{error, info, instrument, warn};

use super::{WorkflowResult, Workflows};

impl Workflows {
    /// Create a new project: issue a number, build the folder tree in
    /// cloud storage, persist the record.
    ///
    /// Failure handling is deliberately asymmetric: a failed top-level
    /// folder aborts the workflow, failed subfolders are warned about
    /// and skipped, and a failed database insert still reports the
    /// folder as created — with an explicit caveat, since the folder
    /// exists whether or not we recorded it.
    #[instrument(skip(self))]
    pub async fn create_project(&self, base_name: Option<&str>) -> WorkflowResult {
        let issued = self.numbering.issue().await;

        let sanitized = base_name.map(|raw| sanitize_base_name(raw, &self.config.name_fillers));
        let project_name = match sanitized.as_deref() {
            Some(base) if !base.is_empty() => format!("{}-{base}", issued.number),
            _ => issued.number.clone(),
        };

        let root = self.config.storage_root_folder_id.as_deref();
        let top = match self.storage.create_folder(&project_name, root).await {
            Ok(folder) => folder,
            Err(e) => {
                error!(error = %e, %project_name, "top-level folder creation failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Erstellen des Projekts.**\n\n\
                     Der Projektordner konnte nicht angelegt werden. Bitte versuche es erneut.",
                );
            }
        };

        let mut failed_subfolders: Vec<&str> = Vec::new();
        for subfolder in &self.config.subfolders {
            if let Err(e) = self
                .storage
                .create_folder(subfolder, Some(&top.folder_id))
                .await
            {
                warn!(error = %e, %subfolder, "subfolder creation failed, continuing");
                failed_subfolders.push(subfolder.as_str());
            }
        }

        let db_saved = match self
            .projects
            .insert(
                &project_name,
                Some(&issued.number),
                &top.folder_id,
                &top.folder_link,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, %project_name, "project record could not be persisted");
                false
            }
        };

        info!(%project_name, db_saved, "project created");

        let created = self.config.subfolders.len() - failed_subfolders.len();
        let db_status = if db_saved {
            "✅ In Datenbank gespeichert"
        } else {
            "⚠️ Datenbank-Speicherung fehlgeschlagen — der Ordner existiert, \
             wurde aber nicht erfasst"
        };

        let mut message = format!(
            "✅ **Projekt erstellt!**\n\n\
             📁 **Projekt:** `{project_name}`\n\
             🏗️ **Ordner:** {created} von {} Standard-Ordnern\n\
             🔗 **Link:** [Projekt öffnen]({})\n\
             🗄️ **Datenbank:** {db_status}",
            self.config.subfolders.len(),
            top.folder_link,
        );
        if !failed_subfolders.is_empty() {
            message.push_str(&format!(
                "\n⚠️ **Nicht angelegt:** {}",
                failed_subfolders.join(", ")
            ));
        }
        if issued.degraded {
            message.push_str(
                "\n⚠️ **Hinweis:** Die Projektnummer wurde ersatzweise aus der Uhrzeit \
                 gebildet, da der Nummernzähler nicht erreichbar war.",
            );
        }

        WorkflowResult::ok(message)
            .with_detail("project_name", &project_name)
            .with_detail("project_number", &issued.number)
            .with_detail("folder_id", &top.folder_id)
            .with_detail("db_saved", db_saved.to_string())
            .with_detail("degraded_number", issued.degraded.to_string())
            .with_detail("failed_subfolders", failed_subfolders.len().to_string())
    }
}

/// Strip locale filler words ("neues projekt", "projekt") from a
/// user-supplied base name, keeping the user's casing for the rest.
fn sanitize_base_name(raw: &str, fillers: &[String]) -> String {
    let mut name = raw.to_string();
    for filler in fillers {
        name = remove_ignore_ascii_case(&name, filler);
    }
    name.trim().to_string()
}

/// Remove every ASCII-case-insensitive occurrence of `needle`.
fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while !rest.is_empty() {
        let window = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        if rest.len() >= needle.len()
            && rest.is_char_boundary(needle.len())
            && rest[..needle.len()].eq_ignore_ascii_case(needle)
        {
            rest = &rest[needle.len()..];
        } else {
            out.push_str(&rest[..window]);
            rest = &rest[window..];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fillers() -> Vec<String> {
        vec!["neues projekt".to_string(), "projekt".to_string()]
    }

    #[test]
    fn filler_words_are_stripped() {
        assert_eq!(
            sanitize_base_name("Neues Projekt EFH Mustermann", &fillers()),
            "EFH Mustermann"
        );
        assert_eq!(sanitize_base_name("Projekt Gewerbehof", &fillers()), "Gewerbehof");
    }

    #[test]
    fn bare_filler_leaves_nothing() {
        assert_eq!(sanitize_base_name("neues projekt", &fillers()), "");
    }

    #[test]
    fn casing_of_the_kept_part_survives() {
        assert_eq!(
            sanitize_base_name("projekt Haus Pöltner", &fillers()),
            "Haus Pöltner"
        );
    }

    #[test]
    fn name_without_fillers_is_untouched() {
        assert_eq!(sanitize_base_name("Kindergarten Zirl", &fillers()), "Kindergarten Zirl");
    }
}
