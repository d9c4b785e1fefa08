use std::collections::HashSet;

use chrono::Utc;
use tracing::info;
use visage_kv::{KVReader, KVTxn};

use crate::db::{FaceDb, decode, encode};
use crate::error::FaceDbError;
use crate::keys::{
    group_id_key, group_key, group_member_key, group_member_prefix, group_prefix, member_key,
    member_prefix, name_key, name_prefix, person_key, person_prefix, trailing_id,
};
use crate::types::{Group, Identity, IdentityUpdate, NewIdentity, PersonRecord};

const ACTIVE: &[u8] = b"1";
const INACTIVE: &[u8] = b"0";

impl FaceDb {
    /// Creates an identity and resolves its groups with get-or-create.
    pub fn create_identity(&self, new: &NewIdentity) -> Result<Identity, FaceDbError> {
        let identity = self.write(|tx| self.create_in(tx, new))?;
        info!(id = identity.id, name = %identity.name, "identity created");
        Ok(identity)
    }

    /// Returns the group named `name`, creating it if needed.
    ///
    /// The group row is inserted only if its unique name key is free; when
    /// another writer got there first the existing row is returned instead.
    pub fn get_or_create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, FaceDbError> {
        self.write(|tx| self.group_in(tx, name, description))
    }

    /// All groups, oldest first.
    pub fn list_groups(&self) -> Result<Vec<Group>, FaceDbError> {
        let mut groups = Vec::new();
        for (_, value) in self.store.scan(&group_prefix(&self.prefix))? {
            groups.push(decode::<Group>(&value)?);
        }
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    /// Returns the active identity `id`, or `None`.
    pub fn get_identity(&self, id: u64) -> Result<Option<Identity>, FaceDbError> {
        let view = self.store.read()?;
        match self.load_person(&*view, id)? {
            Some(rec) if rec.is_active => Ok(Some(self.to_identity(&*view, rec)?)),
            _ => Ok(None),
        }
    }

    /// Returns the active identity with the lowest id named `name`.
    pub fn get_identity_by_name(&self, name: &str) -> Result<Option<Identity>, FaceDbError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let view = self.store.read()?;
        let prefix = name_prefix(&self.prefix, name);
        for (key, flag) in view.scan(&prefix)? {
            if flag != ACTIVE {
                continue;
            }
            let Some(id) = trailing_id(&key, &prefix) else {
                continue;
            };
            if let Some(rec) = self.load_person(&*view, id)? {
                if rec.is_active {
                    return Ok(Some(self.to_identity(&*view, rec)?));
                }
            }
        }
        Ok(None)
    }

    /// Lists identities in id order.
    pub fn list_identities(&self, include_inactive: bool) -> Result<Vec<Identity>, FaceDbError> {
        let view = self.store.read()?;
        let mut out = Vec::new();
        for (_, value) in view.scan(&person_prefix(&self.prefix))? {
            let rec: PersonRecord = decode(&value)?;
            if rec.is_active || include_inactive {
                out.push(self.to_identity(&*view, rec)?);
            }
        }
        Ok(out)
    }

    /// Lists active members of the group named `name`.
    /// An unknown group yields an empty list.
    pub fn list_identities_by_group(&self, name: &str) -> Result<Vec<Identity>, FaceDbError> {
        let view = self.store.read()?;
        let group: Group = match view.get(&group_key(&self.prefix, name))? {
            Some(data) => decode(&data)?,
            None => return Ok(vec![]),
        };

        let prefix = group_member_prefix(&self.prefix, group.id);
        let mut out = Vec::new();
        for (key, _) in view.scan(&prefix)? {
            let Some(id) = trailing_id(&key, &prefix) else {
                continue;
            };
            if let Some(rec) = self.load_person(&*view, id)? {
                if rec.is_active {
                    out.push(self.to_identity(&*view, rec)?);
                }
            }
        }
        Ok(out)
    }

    /// Marks identity `id` inactive. Returns false if it does not exist.
    ///
    /// The identity and all of its encodings drop out of lookups and of the
    /// next encoding snapshot; detection logs stay queryable.
    pub fn soft_delete(&self, id: u64) -> Result<bool, FaceDbError> {
        let changed = self.write(|tx| {
            let Some(mut rec) = self.load_person(&*tx, id)? else {
                return Ok(None);
            };
            if !rec.is_active {
                return Ok(Some(false));
            }
            rec.is_active = false;
            rec.updated_at = Some(Utc::now());
            tx.set(&person_key(&self.prefix, id), &encode(&rec)?)?;
            tx.set(&name_key(&self.prefix, &rec.name, id), INACTIVE)?;
            Ok(Some(true))
        })?;

        match changed {
            None => Ok(false),
            Some(changed) => {
                if changed {
                    info!(id, "identity soft-deleted");
                }
                Ok(true)
            }
        }
    }

    /// Applies a partial update to an active identity.
    /// Returns `None` if the identity does not exist or is inactive.
    pub fn update_identity(
        &self,
        id: u64,
        update: &IdentityUpdate,
    ) -> Result<Option<Identity>, FaceDbError> {
        self.write(|tx| {
            let mut rec = match self.load_person(&*tx, id)? {
                Some(rec) if rec.is_active => rec,
                _ => return Ok(None),
            };

            if let Some(name) = &update.name {
                let name = valid_name(name)?;
                if name != rec.name {
                    tx.delete(&name_key(&self.prefix, &rec.name, id))?;
                    tx.set(&name_key(&self.prefix, name, id), ACTIVE)?;
                    rec.name = name.to_string();
                }
            }
            if let Some(notes) = &update.notes {
                rec.notes = Some(notes.clone());
            }
            if let Some(metadata) = &update.metadata {
                rec.metadata = metadata.clone();
            }
            let groups = match &update.groups {
                Some(names) => self.set_groups_in(tx, id, names)?,
                None => self.group_names(&*tx, id)?,
            };

            rec.updated_at = Some(Utc::now());
            tx.set(&person_key(&self.prefix, id), &encode(&rec)?)?;
            Ok(Some(rec.into_identity(groups)))
        })
    }

    pub(crate) fn create_in(
        &self,
        tx: &mut dyn KVTxn,
        new: &NewIdentity,
    ) -> Result<Identity, FaceDbError> {
        let name = valid_name(&new.name)?;
        let id = self.next_id(tx, "person")?;
        let rec = PersonRecord {
            id,
            name: name.to_string(),
            is_active: true,
            notes: new.notes.clone(),
            metadata: new.metadata.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        tx.set(&person_key(&self.prefix, id), &encode(&rec)?)?;
        tx.set(&name_key(&self.prefix, name, id), ACTIVE)?;
        let groups = self.set_groups_in(tx, id, &new.groups)?;
        Ok(rec.into_identity(groups))
    }

    pub(crate) fn group_in(
        &self,
        tx: &mut dyn KVTxn,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, FaceDbError> {
        let name = valid_name(name)?;
        let key = group_key(&self.prefix, name);
        if let Some(existing) = tx.get(&key)? {
            return decode(&existing);
        }

        let id = self.next_id(tx, "group")?;
        let group = Group {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };

        // A concurrent writer may still have taken the name; re-select it.
        match tx.insert_if_absent(&key, &encode(&group)?)? {
            None => {
                tx.set(&group_id_key(&self.prefix, id), name.as_bytes())?;
                info!(id, name, "group created");
                Ok(group)
            }
            Some(existing) => decode(&existing),
        }
    }

    /// Replaces the membership set of `id`. Returns the new group names in
    /// group id order.
    fn set_groups_in(
        &self,
        tx: &mut dyn KVTxn,
        id: u64,
        names: &[String],
    ) -> Result<Vec<String>, FaceDbError> {
        let prefix = member_prefix(&self.prefix, id);
        for (key, _) in tx.scan(&prefix)? {
            if let Some(gid) = trailing_id(&key, &prefix) {
                tx.delete(&group_member_key(&self.prefix, gid, id))?;
            }
            tx.delete(&key)?;
        }

        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for name in names {
            let group = self.group_in(tx, name, None)?;
            if !seen.insert(group.id) {
                continue;
            }
            tx.set(&member_key(&self.prefix, id, group.id), &[])?;
            tx.set(&group_member_key(&self.prefix, group.id, id), &[])?;
            groups.push(group);
        }
        groups.sort_by_key(|g| g.id);
        Ok(groups.into_iter().map(|g| g.name).collect())
    }
}

fn valid_name(name: &str) -> Result<&str, FaceDbError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FaceDbError::EmptyName);
    }
    Ok(name)
}
