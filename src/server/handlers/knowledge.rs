//! Knowledge base: health conditions, recommendations and their exceptions,
//! anomalies and the medications prescribed for them. Any signed-in user may
//! read and write.

use serde_json::{json, Value};

use crate::models::accounts::User;
use crate::models::knowledge::{
    Anomaly, AnomalyInput, ExceptionDisease, ExceptionDiseaseInput, Medication, MedicationInput,
    PatientHealth, PatientHealthInput, Recommendation, RecommendationInput,
};
use crate::models::validation::{exists, unique, FieldErrors, NON_FIELD_ERRORS};
use super::{extend, filter_by, is_other, row_id};
use crate::server::crud::{Crud, Ctx, Params};
use crate::server::errors::ApiError;
use crate::store::Tables;

fn user_summary(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "role": user.role,
    })
}

/// `?key=value` filter on a label; an absent parameter matches every row.
fn filter_label(params: &Params, key: &str, value: &str) -> bool {
    params.get(key).map_or(true, |wanted| wanted == value)
}

fn next_sequence_no(tables: &Tables, diagnosis: i64) -> i64 {
    tables
        .medications
        .iter()
        .filter(|m| m.diagnosis == diagnosis)
        .map(|m| m.sequence_no)
        .max()
        .unwrap_or(0)
        + 1
}

impl Crud for PatientHealth {
    type Input = PatientHealthInput;

    fn to_input(&self) -> PatientHealthInput {
        PatientHealthInput {
            description: self.description.clone(),
        }
    }

    fn build(input: PatientHealthInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let description = input.description.trim().to_string();
        let mut errors = FieldErrors::new();
        if description.is_empty() {
            errors.add("description", "Description cannot be empty.");
        }
        unique(
            &mut errors,
            "description",
            ctx.tables
                .patient_healths
                .any(|h| h.description == description && is_other(h, current)),
            "patient health condition",
        );
        errors.into_result()?;
        Ok(PatientHealth {
            id: row_id(current),
            description,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| a.description.cmp(&b.description));
    }
}

impl Crud for Recommendation {
    type Input = RecommendationInput;

    fn to_input(&self) -> RecommendationInput {
        RecommendationInput {
            description: self.description.clone(),
            reco_type: self.reco_type,
            context: self.context,
        }
    }

    fn build(input: RecommendationInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let description = input.description.trim().to_string();
        let mut errors = FieldErrors::new();
        if description.is_empty() {
            errors.add("description", "Description cannot be empty.");
        }
        unique(
            &mut errors,
            "description",
            ctx.tables
                .recommendations
                .any(|r| r.description == description && is_other(r, current)),
            "recommendation",
        );
        errors.into_result()?;
        Ok(Recommendation {
            id: row_id(current),
            description,
            reco_type: input.reco_type,
            context: input.context,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_label(params, "reco_type", self.reco_type.as_str())
            && filter_label(params, "context", self.context.as_str())
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| a.description.cmp(&b.description));
    }
}

impl Crud for ExceptionDisease {
    type Input = ExceptionDiseaseInput;

    fn to_input(&self) -> ExceptionDiseaseInput {
        ExceptionDiseaseInput {
            recommendation: self.recommendation,
            health: self.health,
        }
    }

    fn build(input: ExceptionDiseaseInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(
            &mut errors,
            "recommendation_id",
            input.recommendation,
            t.recommendations.contains(input.recommendation),
        );
        exists(
            &mut errors,
            "patient_health_id",
            input.health,
            t.patient_healths.contains(input.health),
        );
        if t.exception_diseases.any(|e| {
            e.recommendation == input.recommendation && e.health == input.health && is_other(e, current)
        }) {
            errors.add("detail", "This exception already exists.");
        }
        errors.into_result()?;
        Ok(ExceptionDisease {
            id: row_id(current),
            recommendation: input.recommendation,
            health: input.health,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|e| (e.recommendation, e.health));
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "recommendation": t.recommendations.get(self.recommendation),
                "patient_health": t.patient_healths.get(self.health),
            }),
        )
    }
}

impl Crud for Anomaly {
    type Input = AnomalyInput;

    fn to_input(&self) -> AnomalyInput {
        AnomalyInput {
            hr_id: self.hr_id,
            sp_id: self.sp_id,
            pr_id: self.pr_id,
            bt_id: self.bt_id,
            resp_id: self.resp_id,
            status: self.status,
        }
    }

    fn build(input: AnomalyInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let row = Anomaly {
            id: row_id(current),
            hr_id: input.hr_id,
            sp_id: input.sp_id,
            pr_id: input.pr_id,
            bt_id: input.bt_id,
            resp_id: input.resp_id,
            status: input.status,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        };
        let mut errors = FieldErrors::new();
        for (field, value) in row.references() {
            if value < 0 {
                errors.add(field, "ID must be a positive integer.");
            }
        }
        errors.into_result()?;
        Ok(row)
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        params
            .get("status")
            .map_or(true, |wanted| match wanted.as_str() {
                "true" | "True" | "1" | "active" => self.status,
                "false" | "False" | "0" | "resolved" => !self.status,
                _ => false,
            })
    }

    /// Newest first.
    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|a| std::cmp::Reverse(a.id));
    }
}

impl Crud for Medication {
    type Input = MedicationInput;

    fn to_input(&self) -> MedicationInput {
        MedicationInput {
            diagnosis: self.diagnosis,
            recommendation: self.recommendation,
            sequence_no: Some(self.sequence_no),
            notes: self.notes.clone(),
        }
    }

    fn build(input: MedicationInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(
            &mut errors,
            "anomaly_id",
            input.diagnosis,
            t.anomalies.contains(input.diagnosis),
        );
        exists(
            &mut errors,
            "recommendation_id",
            input.recommendation,
            t.recommendations.contains(input.recommendation),
        );
        if t.medications.any(|m| {
            m.diagnosis == input.diagnosis
                && m.recommendation == input.recommendation
                && is_other(m, current)
        }) {
            errors.add(
                NON_FIELD_ERRORS,
                "The fields anomaly_id, recommendation_id must make a unique set.",
            );
        }

        // New rows always go to the end of the anomaly's sequence.
        let sequence_no = match current {
            None => next_sequence_no(t, input.diagnosis),
            Some(c) => input.sequence_no.unwrap_or(c.sequence_no),
        };
        if sequence_no < 1 {
            errors.add("sequence_no", "Sequence number must be at least 1.");
        } else if t.medications.any(|m| {
            m.diagnosis == input.diagnosis && m.sequence_no == sequence_no && is_other(m, current)
        }) {
            errors.add(
                "sequence_no",
                "A medication with this sequence number already exists for this anomaly.",
            );
        }
        errors.into_result()?;

        let notes = input.notes.filter(|n| !n.trim().is_empty());
        Ok(Medication {
            id: row_id(current),
            diagnosis: input.diagnosis,
            recommendation: input.recommendation,
            user: current.map_or(ctx.caller.user.id, |c| c.user),
            sequence_no,
            notes,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "diagnosis", self.diagnosis)
            && filter_by(params, "user", self.user)
            && filter_by(params, "sequence_no", self.sequence_no)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|m| (m.diagnosis, m.sequence_no));
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "anomaly": t.anomalies.get(self.diagnosis),
                "recommendation": t.recommendations.get(self.recommendation),
                "user": t.users.get(self.user).map(user_summary),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn anomaly(t: &mut Tables) -> i64 {
        let now = Utc::now();
        t.insert(Anomaly {
            id: 0,
            hr_id: 1,
            sp_id: 1,
            pr_id: 1,
            bt_id: 1,
            resp_id: 1,
            status: true,
            created_at: now,
            updated_at: now,
        })
        .id
    }

    #[test]
    fn sequence_numbers_follow_the_last_medication() {
        let mut t = Tables::default();
        let first = anomaly(&mut t);
        let second = anomaly(&mut t);
        assert_eq!(next_sequence_no(&t, first), 1);
        for seq in [1, 4] {
            let now = Utc::now();
            t.insert(Medication {
                id: 0,
                diagnosis: first,
                recommendation: seq,
                user: 1,
                sequence_no: seq,
                notes: None,
                created_at: now,
                updated_at: now,
            });
        }
        assert_eq!(next_sequence_no(&t, first), 5);
        assert_eq!(next_sequence_no(&t, second), 1);
    }

    #[test]
    fn label_filters_ignore_missing_parameters() {
        let mut params = Params::new();
        assert!(filter_label(&params, "context", "Home"));
        params.insert("context".into(), "Hospital".into());
        assert!(!filter_label(&params, "context", "Home"));
        assert!(filter_label(&params, "context", "Hospital"));
    }
}
