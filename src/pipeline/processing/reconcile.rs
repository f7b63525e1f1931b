//! Participant reconciliation against the contact master.
//!
//! The contacts batch becomes the master identity registry: rows carrying
//! a pre-assigned Contact_ID keep it, the rest are minted, and duplicate
//! emails collapse into one contact. Participants then resolve through
//! the master's email index. Two pre-assigned identities sharing one
//! email is ambiguity we refuse to guess about; the run fails with every
//! such cluster reported at once.

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::common::constants::{CONTACTS_TABLE, CONTACT_ID_COLUMN, MAILTO_PREFIX, PARTICIPANTS_TABLE};
use crate::domain::{CellValue, Contact, ContactId, EntityKind, MarketingParticipant, TypedRecord};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::{mint as mint_metrics, reconcile as reconcile_metrics};
use crate::pipeline::processing::audit::{
    AuditAction, AuditEntry, AuditLog, DuplicateEmailCluster,
};
use crate::pipeline::processing::mint::IdMinter;
use crate::pipeline::processing::normalize::cleaning;
use crate::registry::{ReconcileConfig, TableSchema};

/// Canonical matching form of an email cell. Returns None when the cell
/// does not look like an address at all.
pub fn normalize_email(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    // "Jane Doe <jane@x.com>" and "<jane@x.com>" both carry the address
    // inside angle brackets
    if let (Some(start), Some(end)) = (text.find('<'), text.rfind('>')) {
        if start < end {
            text = &text[start + 1..end];
        }
    }
    let mut email = text.trim().to_lowercase();
    if email.starts_with(MAILTO_PREFIX) {
        email = email[MAILTO_PREFIX.len()..].trim().to_string();
    }
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Canonical matching form of a person name.
fn normalize_name(raw: &str) -> String {
    cleaning::clean_text(raw).to_lowercase()
}

/// A pre-assigned identity on a contacts row, if the export carried one.
fn supplied_contact_id(record: &TypedRecord) -> Option<u64> {
    match record.get(CONTACT_ID_COLUMN)? {
        CellValue::Number(n) if *n >= 1.0 && n.fract() == 0.0 => Some(*n as u64),
        CellValue::Text(t) => t.trim().parse().ok(),
        _ => None,
    }
}

/// The master contact registry plus its email index.
#[derive(Debug)]
pub struct ContactMaster {
    contacts: Vec<Contact>,
    by_email: HashMap<String, ContactId>,
}

impl ContactMaster {
    /// Build the master from the contacts batch, in row order.
    ///
    /// Pre-assigned IDs are honored and the minter is advanced past the
    /// largest one so fresh IDs never collide. Rows sharing a normalized
    /// email merge into the first occurrence unless they carry distinct
    /// pre-assigned IDs, which is fatal.
    pub fn build(
        records: &[TypedRecord],
        schema: Option<&TableSchema>,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
    ) -> Result<Self> {
        let max_supplied = records.iter().filter_map(supplied_contact_id).max();
        if let Some(max) = max_supplied {
            minter.advance_past(EntityKind::Contact, max);
        }

        let name_column = schema.and_then(|s| s.name_column.as_deref());
        let email_column = schema.and_then(|s| s.email_column.as_deref());
        let phone_column = schema.and_then(|s| s.phone_column.as_deref());

        let mut master = Self {
            contacts: Vec::new(),
            by_email: HashMap::new(),
        };
        let mut clusters: HashMap<String, Vec<ContactId>> = HashMap::new();

        for (row, record) in records.iter().enumerate() {
            let email = email_column
                .and_then(|c| record.get(c))
                .and_then(CellValue::as_text)
                .and_then(normalize_email);

            if let Some(email) = &email {
                if let Some(existing_id) = master.by_email.get(email).copied() {
                    match supplied_contact_id(record) {
                        Some(id) if ContactId(id) != existing_id => {
                            // Two distinct pre-assigned identities claim
                            // this email
                            let cluster = clusters
                                .entry(email.clone())
                                .or_insert_with(|| vec![existing_id]);
                            if !cluster.contains(&ContactId(id)) {
                                cluster.push(ContactId(id));
                            }
                        }
                        _ => {
                            master.merge_into(existing_id, record, name_column, phone_column);
                            mint_metrics::duplicate_collapsed();
                            audit.record(
                                AuditEntry::new(
                                    AuditAction::DuplicateMerged,
                                    CONTACTS_TABLE,
                                    row,
                                )
                                .with_note(&format!("merged into contact {}", existing_id)),
                            );
                            debug!("Merged duplicate contact row {} into {}", row, existing_id);
                        }
                    }
                    continue;
                }
            }

            let contact_id = match supplied_contact_id(record) {
                Some(id) => ContactId(id),
                None => minter.next_contact()?,
            };
            let mut attributes = record.clone();
            attributes.remove(CONTACT_ID_COLUMN);
            if let Some(email) = &email {
                master.by_email.insert(email.clone(), contact_id);
            }
            master.contacts.push(Contact {
                contact_id,
                full_name: name_column
                    .and_then(|c| record.get(c))
                    .and_then(CellValue::as_text)
                    .map(str::to_string),
                email,
                phone: phone_column
                    .and_then(|c| record.get(c))
                    .and_then(CellValue::as_text)
                    .map(str::to_string),
                attributes,
            });
        }

        if !clusters.is_empty() {
            let mut clusters: Vec<DuplicateEmailCluster> = clusters
                .into_iter()
                .map(|(email, mut contact_ids)| {
                    contact_ids.sort();
                    DuplicateEmailCluster { email, contact_ids }
                })
                .collect();
            clusters.sort_by(|a, b| a.email.cmp(&b.email));
            for cluster in &clusters {
                error!("Ambiguous contact identity: {}", cluster);
            }
            return Err(PipelineError::DuplicateIdentity { clusters });
        }

        info!(
            "📇 Contact master holds {} contact(s) from {} row(s)",
            master.contacts.len(),
            records.len()
        );
        Ok(master)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    fn contact_mut(&mut self, contact_id: ContactId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.contact_id == contact_id)
    }

    /// Participant rows enrich only the identity fields of a matched
    /// contact; their other columns stay on the participant row.
    fn backfill_identity(
        &mut self,
        contact_id: ContactId,
        name: Option<&str>,
        phone: Option<&str>,
    ) {
        let Some(contact) = self.contact_mut(contact_id) else {
            return;
        };
        if contact.full_name.is_none() {
            contact.full_name = name.map(str::to_string);
        }
        if contact.phone.is_none() {
            contact.phone = phone.map(str::to_string);
        }
    }

    /// A name-matched contact without an email adopts the participant's
    /// address and joins the index. A present email is never replaced.
    fn backfill_email(&mut self, contact_id: ContactId, email: &str) {
        let Some(contact) = self.contact_mut(contact_id) else {
            return;
        };
        if contact.email.is_some() {
            return;
        }
        contact.email = Some(email.to_string());
        self.by_email.insert(email.to_string(), contact_id);
    }

    /// Enrichment only: fill fields the master is missing, never
    /// overwrite a present value.
    fn merge_into(
        &mut self,
        contact_id: ContactId,
        record: &TypedRecord,
        name_column: Option<&str>,
        phone_column: Option<&str>,
    ) {
        let name = name_column
            .and_then(|c| record.get(c))
            .and_then(CellValue::as_text)
            .map(str::to_string);
        let phone = phone_column
            .and_then(|c| record.get(c))
            .and_then(CellValue::as_text)
            .map(str::to_string);
        let Some(contact) = self.contact_mut(contact_id) else {
            return;
        };
        if contact.full_name.is_none() {
            contact.full_name = name;
        }
        if contact.phone.is_none() {
            contact.phone = phone;
        }
        for (column, value) in record.iter() {
            if column == CONTACT_ID_COLUMN || value.is_absent() {
                continue;
            }
            let missing = contact
                .attributes
                .get(column)
                .map(CellValue::is_absent)
                .unwrap_or(true);
            if missing {
                contact.attributes.insert(column.to_string(), value.clone());
            }
        }
    }
}

/// Resolves participant rows to contact identities.
pub struct Reconciler {
    master: ContactMaster,
    by_name: HashMap<String, Vec<ContactId>>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(master: ContactMaster, config: ReconcileConfig) -> Self {
        let mut by_name: HashMap<String, Vec<ContactId>> = HashMap::new();
        if config.name_fallback {
            for contact in &master.contacts {
                if let Some(name) = &contact.full_name {
                    by_name
                        .entry(normalize_name(name))
                        .or_default()
                        .push(contact.contact_id);
                }
            }
        }
        Self {
            master,
            by_name,
            config,
        }
    }

    /// Resolve every participant row to a Contact_ID, minting contacts
    /// for the unmatched. Row order fixes all assignments, so the same
    /// batch against the same master always resolves identically.
    pub fn reconcile(
        &mut self,
        records: &[TypedRecord],
        schema: Option<&TableSchema>,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
    ) -> Result<Vec<MarketingParticipant>> {
        let name_column = schema.and_then(|s| s.name_column.as_deref());
        let email_column = schema.and_then(|s| s.email_column.as_deref());
        let phone_column = schema.and_then(|s| s.phone_column.as_deref());
        let event_column = schema.and_then(|s| s.event_column.as_deref());

        let mut participants = Vec::with_capacity(records.len());
        let mut matched_email = 0usize;
        let mut matched_name = 0usize;
        let mut created = 0usize;

        for (row, record) in records.iter().enumerate() {
            let email = email_column
                .and_then(|c| record.get(c))
                .and_then(CellValue::as_text)
                .and_then(normalize_email);
            let name = name_column
                .and_then(|c| record.get(c))
                .and_then(CellValue::as_text);

            let phone = phone_column
                .and_then(|c| record.get(c))
                .and_then(CellValue::as_text);

            // Email is the primary key into the master; a miss (or no
            // email at all) falls through to the name fallback before
            // anything is minted
            let email_match = email
                .as_ref()
                .and_then(|e| self.master.by_email.get(e).copied());
            let contact_id = match email_match {
                Some(existing_id) => {
                    self.master.backfill_identity(existing_id, name, phone);
                    reconcile_metrics::matched_email();
                    matched_email += 1;
                    audit.record(
                        AuditEntry::new(AuditAction::MatchedEmail, PARTICIPANTS_TABLE, row)
                            .with_note(&format!(
                                "'{}' resolved to contact {}",
                                email.as_deref().unwrap_or_default(),
                                existing_id
                            )),
                    );
                    existing_id
                }
                None => match self.match_by_name(name, row, audit) {
                    Some(existing_id) => {
                        self.master.backfill_identity(existing_id, name, phone);
                        if let Some(email) = &email {
                            self.master.backfill_email(existing_id, email);
                        }
                        reconcile_metrics::matched_name();
                        matched_name += 1;
                        audit.record(
                            AuditEntry::new(AuditAction::MatchedName, PARTICIPANTS_TABLE, row)
                                .with_note(&format!("name resolved to contact {}", existing_id)),
                        );
                        existing_id
                    }
                    None => self.create_contact(
                        email.clone(),
                        name,
                        phone,
                        row,
                        minter,
                        audit,
                        &mut created,
                    )?,
                },
            };

            participants.push(MarketingParticipant {
                participant_id: minter.next_participant()?,
                event: event_column
                    .and_then(|c| record.get(c))
                    .and_then(CellValue::as_text)
                    .map(str::to_string),
                contact_id,
                attributes: record.clone(),
            });
        }

        info!(
            "🤝 Reconciled {} participant(s): {} email match(es), {} name match(es), {} new contact(s)",
            participants.len(),
            matched_email,
            matched_name,
            created
        );
        Ok(participants)
    }

    /// The updated master including every contact minted during
    /// reconciliation.
    pub fn into_contacts(self) -> Vec<Contact> {
        self.master.contacts
    }

    fn match_by_name(
        &self,
        name: Option<&str>,
        row: usize,
        audit: &mut AuditLog,
    ) -> Option<ContactId> {
        if !self.config.name_fallback {
            return None;
        }
        let candidates = self.by_name.get(&normalize_name(name?))?;
        match candidates.as_slice() {
            [single] => Some(*single),
            [] => None,
            many => {
                reconcile_metrics::ambiguous();
                let ids: Vec<String> = many.iter().map(|id| id.to_string()).collect();
                audit.record(
                    AuditEntry::new(AuditAction::AmbiguousName, PARTICIPANTS_TABLE, row)
                        .with_note(&format!(
                            "name matches contacts [{}], treating as unmatched",
                            ids.join(", ")
                        )),
                );
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create_contact(
        &mut self,
        email: Option<String>,
        name: Option<&str>,
        phone: Option<&str>,
        row: usize,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
        created: &mut usize,
    ) -> Result<ContactId> {
        let contact_id = minter.next_contact()?;
        reconcile_metrics::created();
        *created += 1;
        audit.record(
            AuditEntry::new(AuditAction::ContactCreated, PARTICIPANTS_TABLE, row).with_note(
                &match &email {
                    Some(email) => format!("contact {} minted for '{}'", contact_id, email),
                    None => format!("contact {} minted without email", contact_id),
                },
            ),
        );
        if let Some(email) = &email {
            self.master.by_email.insert(email.clone(), contact_id);
        }
        if self.config.name_fallback {
            if let Some(name) = name {
                self.by_name
                    .entry(normalize_name(name))
                    .or_default()
                    .push(contact_id);
            }
        }
        self.master.contacts.push(Contact {
            contact_id,
            full_name: name.map(str::to_string),
            email,
            phone: phone.map(str::to_string),
            attributes: TypedRecord::new(),
        });
        Ok(contact_id)
    }
}
