use std::collections::HashMap;

use chrono::Utc;
use tracing::info;
use visage_kv::KVTxn;

use crate::db::{FaceDb, check_unit, decode, encode};
use crate::error::FaceDbError;
use crate::keys::{encoding_key, encoding_prefix, image_key, image_prefix, person_prefix};
use crate::types::{
    Encoding, EncodingReport, Enrolled, InvalidEncoding, KnownEncoding, NewIdentity,
    NewReferenceImage, PersonRecord, ReferenceImage,
};

impl FaceDb {
    /// Stores a new encoding for an active identity.
    pub fn add_encoding(
        &self,
        identity_id: u64,
        vector: &[f32],
        quality_score: Option<f32>,
    ) -> Result<Encoding, FaceDbError> {
        self.write(|tx| self.add_encoding_in(tx, identity_id, vector, quality_score))
    }

    /// All encodings of one identity, active or not, oldest first.
    pub fn get_encodings(&self, identity_id: u64) -> Result<Vec<Encoding>, FaceDbError> {
        let entries = self
            .store
            .scan(&encoding_prefix(&self.prefix, Some(identity_id)))?;
        entries.iter().map(|(_, v)| decode(v)).collect()
    }

    /// Stores a reference image for an active identity.
    pub fn add_reference_image(
        &self,
        identity_id: u64,
        image: &NewReferenceImage,
    ) -> Result<ReferenceImage, FaceDbError> {
        self.write(|tx| self.add_image_in(tx, identity_id, image))
    }

    /// Reference images of one identity, oldest first.
    pub fn reference_images(&self, identity_id: u64) -> Result<Vec<ReferenceImage>, FaceDbError> {
        let entries = self.store.scan(&image_prefix(&self.prefix, identity_id))?;
        entries.iter().map(|(_, v)| decode(v)).collect()
    }

    /// Creates an identity together with its first encoding and reference
    /// image. Either all three rows are written or none is.
    pub fn enroll(
        &self,
        new: &NewIdentity,
        vector: &[f32],
        quality_score: Option<f32>,
        image: &NewReferenceImage,
    ) -> Result<Enrolled, FaceDbError> {
        let enrolled = self.write(|tx| {
            let identity = self.create_in(tx, new)?;
            let encoding = self.add_encoding_in(tx, identity.id, vector, quality_score)?;
            let image = self.add_image_in(tx, identity.id, image)?;
            Ok(Enrolled {
                identity,
                encoding,
                image,
            })
        })?;
        info!(
            id = enrolled.identity.id,
            name = %enrolled.identity.name,
            groups = ?enrolled.identity.groups,
            "identity enrolled"
        );
        Ok(enrolled)
    }

    /// Active encodings of active identities, ordered by identity id then
    /// encoding id, read from one consistent view.
    ///
    /// Vectors are returned as stored; length checks are left to the caller.
    pub fn matchable_encodings(&self) -> Result<Vec<KnownEncoding>, FaceDbError> {
        let view = self.store.read()?;

        let mut names: HashMap<u64, String> = HashMap::new();
        for (_, value) in view.scan(&person_prefix(&self.prefix))? {
            let rec: PersonRecord = decode(&value)?;
            if rec.is_active {
                names.insert(rec.id, rec.name);
            }
        }

        let mut out = Vec::new();
        for (_, value) in view.scan(&encoding_prefix(&self.prefix, None))? {
            let enc: Encoding = decode(&value)?;
            if !enc.is_active {
                continue;
            }
            let Some(name) = names.get(&enc.identity_id) else {
                continue;
            };
            out.push(KnownEncoding {
                identity_id: enc.identity_id,
                encoding_id: enc.id,
                name: name.clone(),
                vector: enc.vector,
            });
        }
        Ok(out)
    }

    /// Scans every stored encoding and reports those of the wrong length.
    pub fn verify_encodings(&self) -> Result<EncodingReport, FaceDbError> {
        let mut report = EncodingReport {
            dim: self.dim,
            ..Default::default()
        };
        for (_, value) in self.store.scan(&encoding_prefix(&self.prefix, None))? {
            let enc: Encoding = decode(&value)?;
            report.total += 1;
            if enc.vector.len() != self.dim {
                report.invalid.push(InvalidEncoding {
                    identity_id: enc.identity_id,
                    encoding_id: enc.id,
                    len: enc.vector.len(),
                });
            }
        }
        Ok(report)
    }

    pub(crate) fn add_encoding_in(
        &self,
        tx: &mut dyn KVTxn,
        identity_id: u64,
        vector: &[f32],
        quality_score: Option<f32>,
    ) -> Result<Encoding, FaceDbError> {
        if vector.len() != self.dim {
            return Err(FaceDbError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if let Some(q) = quality_score {
            check_unit("quality_score", q)?;
        }
        self.require_active(&*tx, identity_id)?;

        let id = self.next_id(tx, "encoding")?;
        let enc = Encoding {
            id,
            identity_id,
            vector: vector.to_vec(),
            quality_score,
            is_active: true,
            created_at: Utc::now(),
        };
        tx.set(
            &encoding_key(&self.prefix, identity_id, id),
            &encode(&enc)?,
        )?;
        Ok(enc)
    }

    fn add_image_in(
        &self,
        tx: &mut dyn KVTxn,
        identity_id: u64,
        image: &NewReferenceImage,
    ) -> Result<ReferenceImage, FaceDbError> {
        self.require_active(&*tx, identity_id)?;

        let id = self.next_id(tx, "image")?;
        let img = ReferenceImage {
            id,
            identity_id,
            data: image.data.clone(),
            image_type: image.image_type.clone(),
            metadata: image.metadata.clone(),
            created_at: Utc::now(),
        };
        tx.set(&image_key(&self.prefix, identity_id, id), &encode(&img)?)?;
        Ok(img)
    }
}
