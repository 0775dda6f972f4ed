//! The commit transaction: validation, staging, provenance, finalization.

use super::{
    classify_documents, CommitOptions, CommitReport, CommittedDocument, Destination,
    PaginationReport, ProvenanceMap, ProvenanceRecord,
};
use crate::collab::{NamingAuthority, OutputCodec, PageRenderSpec, ProvenanceSink, WrittenFile};
use crate::error::{Error, Result};
use crate::model::{DocId, DocumentForm, PageId, PageStore, SourceId};
use crate::notify::Notification;
use crate::selection::SelectionState;
use crate::sequence::Sequence;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Collaborators a commit needs.
pub struct CommitContext<'a> {
    /// Produces the output files.
    pub codec: &'a dyn OutputCodec,

    /// Receives the audit mapping.
    pub provenance: &'a dyn ProvenanceSink,

    /// Allocates final filenames.
    pub naming: &'a dyn NamingAuthority,
}

/// Run a commit transaction over the current sequence.
///
/// Semantics are at-least-once: output files staged in a temporary
/// directory are moved to their final names only after the provenance sink
/// accepts the audit record, and per-document failures are aggregated into
/// one error rather than surfaced piecemeal. Nothing already finalized is
/// rolled back.
pub fn run_commit(
    seq: &mut Sequence,
    store: &PageStore,
    selection: &SelectionState,
    options: &CommitOptions,
    ctx: &CommitContext<'_>,
) -> Result<(CommitReport, Vec<Notification>)> {
    // 1. Scope and boundary validation: a document is either wholly in the
    // commit or wholly out of it. A document the operator marked for commit
    // counts as wholly selected regardless of its elements.
    let all_docs: Vec<DocId> = seq.documents().map(|d| d.id).collect();
    let mut targets: Vec<DocId> = Vec::new();
    if options.only_selection {
        let mut partial: Vec<String> = Vec::new();
        for &d in &all_docs {
            let doc = match seq.document(d) {
                Some(doc) => doc,
                None => continue,
            };
            let total = doc.pages.len();
            let selected = doc
                .pages
                .iter()
                .filter(|p| selection.is_selected(**p))
                .count();
            if selected == 0 && !doc.selected_for_commit {
                continue;
            }
            if !doc.selected_for_commit && selected < total && !options.auto_expand {
                partial.push(doc.filename.clone());
            } else {
                targets.push(d);
            }
        }
        if !partial.is_empty() {
            return Err(Error::CommitValidationFailed { documents: partial });
        }
    } else {
        targets = all_docs;
    }

    // 2. Documents with no live page produce no output.
    targets.retain(|&d| !seq.live_instances(d, store).is_empty());

    // 3. Classification and final names.
    let classes = classify_documents(seq, store, &targets);
    let mut final_names: HashMap<DocId, String> = HashMap::new();
    for (d, _, _) in &classes {
        if let Some(doc) = seq.document(*d) {
            final_names.insert(*d, ctx.naming.assign(&doc.filename));
        }
    }

    // 4. Provenance map, assembled before any file moves.
    let provenance = build_provenance(seq, store, &classes, &final_names);

    // 5. Stage output files in a temporary directory next to the final
    // location, so finalization is a same-filesystem rename and no watcher
    // of the output directory picks up half-written files.
    std::fs::create_dir_all(&options.output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".repage-")
        .tempdir_in(&options.output_dir)?;
    let mut staged: Vec<(DocId, DocumentForm, String, WrittenFile)> = Vec::new();
    let mut failures: Vec<(String, String)> = Vec::new();
    for (i, (d, form, sid)) in classes.iter().enumerate() {
        let Some(final_name) = final_names.get(d).cloned() else {
            continue;
        };
        let tmp = staging.path().join(format!("doc-{i}"));
        let result = match (form, sid) {
            (DocumentForm::InSourceForm, Some(sid)) => {
                let source_name = store
                    .source(*sid)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                ctx.codec.copy_verbatim(&source_name, &tmp)
            }
            _ => {
                let specs = render_specs(seq, store, *d);
                ctx.codec.write_document(&specs, &tmp)
            }
        };
        match result {
            Ok(file) => staged.push((*d, *form, final_name, file)),
            Err(e) => failures.push((final_name, e.to_string())),
        }
    }

    // 6. External bookkeeping must succeed before anything is finalized.
    ctx.provenance
        .record(&provenance)
        .map_err(|e| Error::ProvenanceWriteFailed(e.to_string()))?;

    // 7. Move staged files to their final names.
    let mut written = Vec::new();
    let mut notes = Vec::new();
    for (d, form, final_name, file) in staged {
        let final_path = options.output_dir.join(&final_name);
        match finalize_file(&file.path, &final_path) {
            Ok(()) => {
                if let Some(doc) = seq.document_mut(d) {
                    doc.committed = true;
                    doc.selected_for_commit = false;
                }
                written.push(CommittedDocument {
                    document: d,
                    filename: final_name,
                    form,
                    file: WrittenFile {
                        path: final_path.clone(),
                        page_count: file.page_count,
                        bytes: file.bytes,
                    },
                });
                notes.push(Notification::DocumentCommitted {
                    document: d,
                    file: final_path,
                });
            }
            Err(e) => failures.push((final_name, e.to_string())),
        }
    }

    if !failures.is_empty() {
        log::warn!("commit finished with {} failure(s)", failures.len());
        return Err(Error::CommitFailed { failures });
    }

    let pagination = build_report(store, &classes, &provenance);
    notes.push(Notification::Paginated(pagination.clone()));
    notes.push(Notification::StateChanged);
    Ok((
        CommitReport {
            written,
            provenance,
            pagination,
            finished_at: Utc::now(),
        },
        notes,
    ))
}

fn render_specs(seq: &Sequence, store: &PageStore, doc: DocId) -> Vec<PageRenderSpec> {
    seq.live_instances(doc, store)
        .iter()
        .filter_map(|e| seq.page_of(*e))
        .filter_map(|p| store.page(p))
        .map(|page| PageRenderSpec {
            source: page.key.source.clone(),
            number: page.key.number,
            rotation: page.rotation,
        })
        .collect()
}

/// Build the source-to-destination audit mapping.
///
/// Only non-deleted instances contribute destinations: when a page is
/// deleted in one instance but alive elsewhere, the first non-deleted
/// instance in sequence order is authoritative (its destination is listed
/// first). A source page with no destination at all is recorded as deleted.
fn build_provenance(
    seq: &Sequence,
    store: &PageStore,
    classes: &[(DocId, DocumentForm, Option<SourceId>)],
    final_names: &HashMap<DocId, String>,
) -> ProvenanceMap {
    let mut touched: BTreeSet<SourceId> = BTreeSet::new();
    let mut dest_of: HashMap<PageId, Vec<Destination>> = HashMap::new();

    for (d, _, _) in classes {
        let Some(name) = final_names.get(d) else {
            continue;
        };
        for (i, el) in seq.live_instances(*d, store).iter().enumerate() {
            if let Some(page) = seq.page_of(*el) {
                dest_of.entry(page).or_default().push(Destination {
                    filename: name.clone(),
                    page_number: (i + 1) as u32,
                });
            }
        }
        // Ghost instances still mark their source as touched by the commit.
        if let Some(doc) = seq.document(*d) {
            for el in &doc.pages {
                if let Some(page) = seq.page_of(*el).and_then(|p| store.page(p)) {
                    touched.insert(page.source);
                }
            }
        }
    }

    let mut records = Vec::new();
    for sid in touched {
        let Some(source) = store.source(sid) else {
            continue;
        };
        for page_id in &source.pages {
            let Some(page) = store.page(*page_id) else {
                continue;
            };
            let destinations = dest_of.remove(page_id).unwrap_or_default();
            records.push(ProvenanceRecord {
                source: source.name.clone(),
                number: page.key.number,
                deleted: destinations.is_empty(),
                destinations,
            });
        }
    }
    ProvenanceMap {
        recorded_at: Utc::now(),
        records,
    }
}

fn build_report(
    store: &PageStore,
    classes: &[(DocId, DocumentForm, Option<SourceId>)],
    provenance: &ProvenanceMap,
) -> PaginationReport {
    let mut report = PaginationReport::default();

    // A source is consumed when every one of its pages reached an output.
    let mut sources: Vec<&str> = provenance.records.iter().map(|r| r.source.as_str()).collect();
    sources.dedup();
    for name in sources {
        let consumed = provenance
            .records
            .iter()
            .filter(|r| r.source == name)
            .all(|r| !r.destinations.is_empty());
        if consumed {
            report.consumed.push(name.to_string());
        }
    }

    for (_, form, sid) in classes {
        let Some(source) = sid.and_then(|s| store.source(s)) else {
            continue;
        };
        match form {
            DocumentForm::InSourceForm => {
                report.left_in_source_form.push(source.name.clone());
                if source.pagination_suggested {
                    report.suggestion_disregarded.push(source.name.clone());
                }
            }
            DocumentForm::CopyOfSource => {
                if source.pagination_suggested
                    && !report.suggestion_disregarded.contains(&source.name)
                {
                    report.suggestion_disregarded.push(source.name.clone());
                }
            }
            DocumentForm::Modified => {}
        }
    }
    report
}

fn finalize_file(tmp: &Path, dest: &Path) -> std::io::Result<()> {
    match std::fs::rename(tmp, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(tmp, dest)?;
            let _ = std::fs::remove_file(tmp);
            Ok(())
        }
    }
}
