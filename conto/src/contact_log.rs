use std::collections::HashMap;
use std::io;

use itertools::Itertools;
use serde::Serialize;

use crate::{AgentId, Contact, ContactId, ContactStatistics, ContactStatus, ContactType, Result, Skill};

/// Final state of a contact, written once it is completed or abandoned. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    /// Contact ID.
    pub id: ContactId,
    /// Contact type.
    pub contact_type: ContactType,
    /// Skill selected in the menu, if the contact got that far.
    pub skill: Option<Skill>,
    /// Terminal status.
    pub status: ContactStatus,
    /// Time of arrival.
    pub arrival_time: f64,
    /// Time of answer, if answered.
    pub answer_time: Option<f64>,
    /// Agent who handled the contact.
    pub handled_by: Option<AgentId>,
    /// Time from arrival to completion; zero for abandoned contacts.
    pub duration: f64,
    /// Number of holds.
    pub hold_count: usize,
    /// Total time on hold.
    pub hold_duration: f64,
    /// Time from arrival to answer; zero for abandoned contacts.
    pub wait_time: f64,
}

impl From<&Contact> for ContactRecord {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id(),
            contact_type: contact.contact_type(),
            skill: contact.skill(),
            status: contact.status(),
            arrival_time: contact.arrival_time().as_secs_f64(),
            answer_time: contact.answer_time().map(|t| t.as_secs_f64()),
            handled_by: contact.handled_by(),
            duration: contact.duration().as_secs_f64(),
            hold_count: contact.hold_count(),
            hold_duration: contact.hold_duration().as_secs_f64(),
            wait_time: contact.wait_time().as_secs_f64(),
        }
    }
}

/// Stores the contacts at different stages of simulation: live contacts by ID, and records of
/// the finished ones, together with their aggregated statistics.
#[derive(Default)]
pub struct ContactLog {
    live: HashMap<ContactId, Contact>,
    finished: Vec<ContactRecord>,
    finished_index: HashMap<ContactId, usize>,
    statistics: ContactStatistics,
}

impl ContactLog {
    /// Registers a newly arrived contact.
    pub fn open(&mut self, contact: Contact) {
        if let Some(previous) = self.live.insert(contact.id(), contact) {
            log::error!("Contact {} registered twice", previous.id());
        }
    }

    /// Returns a live contact.
    #[must_use]
    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.live.get(&id)
    }

    /// Returns a live contact for modification.
    pub fn get_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.live.get_mut(&id)
    }

    /// Moves a contact in a terminal state from live contacts to the finished ones, and folds it
    /// into the statistics. Returns the record, or `None` if no such live contact exists or if it
    /// is not in a terminal state, in which case it stays live.
    pub fn close(&mut self, id: ContactId) -> Option<&ContactRecord> {
        if !self.live.get(&id)?.status().is_terminal() {
            log::error!("Contact {} closed before reaching a terminal state", id);
            return None;
        }
        let contact = self.live.remove(&id)?;
        let record = ContactRecord::from(&contact);
        self.statistics.add(&record);
        self.finished_index.insert(id, self.finished.len());
        self.finished.push(record);
        self.finished.last()
    }

    /// Returns the status of a live or finished contact.
    #[must_use]
    pub fn status(&self, id: ContactId) -> Option<ContactStatus> {
        self.live
            .get(&id)
            .map(Contact::status)
            .or_else(|| self.record(id).map(|r| r.status))
    }

    /// Returns the record of a finished contact.
    #[must_use]
    pub fn record(&self, id: ContactId) -> Option<&ContactRecord> {
        self.finished_index.get(&id).map(|&idx| &self.finished[idx])
    }

    /// Number of contacts that have arrived but not finished yet.
    #[must_use]
    pub fn live_contacts(&self) -> usize {
        self.live.len()
    }

    /// Records of finished contacts, in order of completion.
    #[must_use]
    pub fn finished(&self) -> &[ContactRecord] {
        &self.finished
    }

    /// Aggregated statistics of the finished contacts.
    #[must_use]
    pub fn statistics(&self) -> &ContactStatistics {
        &self.statistics
    }

    /// Writes all finished records as CSV with a header, ordered by contact ID.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in self.finished.iter().sorted_by_key(|r| r.id) {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
