//! Connection and group registries
//!
//! The sole source of truth for who is connected and which groups exist.
//! Owned exclusively by the `ChatServer` actor; every mutation goes through
//! it, one command at a time, so no locking is involved anywhere.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::error::AppError;
use crate::name::is_valid_name;

/// Server-side cap on the number of groups
pub const MAX_GROUPS: usize = 50;

/// A registered client: its name bound to the connection's outbound channel
///
/// Frames queued on `sender` are written to the socket by the connection's
/// write task, in order.
#[derive(Debug)]
pub struct ClientEntry {
    /// Outbound frame payloads, drained by the connection handler
    pub sender: mpsc::Sender<String>,
}

impl ClientEntry {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }

    /// Queue one frame payload for this client
    ///
    /// Fails only when the connection's write task is gone.
    pub async fn send(&self, payload: String) -> Result<(), AppError> {
        self.sender
            .send(payload)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

/// All connected clients and all groups
#[derive(Debug, Default)]
pub struct Registry {
    /// name -> connection, at most one live connection per name
    clients: HashMap<String, ClientEntry>,
    /// group name -> member names, fixed at creation, shrunk on exit
    groups: HashMap<String, Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client; fails on a name already in use
    pub fn register(&mut self, name: &str, entry: ClientEntry) -> Result<(), AppError> {
        if self.clients.contains_key(name) {
            return Err(AppError::DuplicateName);
        }
        self.clients.insert(name.to_string(), entry);
        Ok(())
    }

    /// Remove a client from the client map and from every group
    ///
    /// Groups persist even when emptied; group deletion is not part of the
    /// protocol.
    pub fn unregister(&mut self, name: &str) {
        self.clients.remove(name);
        for members in self.groups.values_mut() {
            members.retain(|m| m != name);
        }
    }

    pub fn is_client(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn client(&self, name: &str) -> Option<&ClientEntry> {
        self.clients.get(name)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// All connected client names, lexicographically sorted
    pub fn sorted_client_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// The `who` feedback line: sorted names joined by commas, "" when empty
    pub fn who_line(&self) -> String {
        self.sorted_client_names().join(",")
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_members(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Validate and commit a new group, checks in protocol order
    ///
    /// The committed member list is the sorted, deduplicated union of the
    /// listed members and the creator. Rejection reasons, short-circuiting:
    /// invalid group name, group cap reached, name collision with any client
    /// or group, a listed member not currently connected. The client checks
    /// the name too, but a raw socket may not have, and the registries must
    /// never hold a name the protocol could not address.
    pub fn create_group(
        &mut self,
        creator: &str,
        group: &str,
        members: &[String],
    ) -> Result<(), AppError> {
        if !is_valid_name(group) {
            return Err(AppError::InvalidName(group.to_string()));
        }
        if self.groups.len() >= MAX_GROUPS {
            return Err(AppError::GroupLimit);
        }
        if self.clients.contains_key(group) || self.groups.contains_key(group) {
            return Err(AppError::DuplicateName);
        }
        let mut list: Vec<String> = members.to_vec();
        list.push(creator.to_string());
        list.sort_unstable();
        list.dedup();
        if let Some(missing) = list.iter().find(|m| !self.clients.contains_key(*m)) {
            return Err(AppError::UnknownMember(missing.clone()));
        }
        self.groups.insert(group.to_string(), list);
        Ok(())
    }
}
