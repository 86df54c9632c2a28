//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Sales opportunities.
    ///
    /// `version` starts at 1 and is advanced by every lifecycle write; updates
    /// filter on it to serialise concurrent writers.
    deals (id) {
        id -> Uuid,
        name -> Varchar,
        company -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        phone_country_code -> Varchar,
        client_id -> Nullable<Uuid>,
        /// One of `lead`, `qualified`, `proposal`, `negotiation`, `won`, `lost`.
        stage -> Varchar,
        value -> Int8,
        currency -> Varchar,
        probability -> Int2,
        priority -> Varchar,
        source -> Nullable<Varchar>,
        tags -> Array<Text>,
        owner_id -> Uuid,
        created_by -> Uuid,
        notes -> Nullable<Text>,
        expected_close_date -> Nullable<Date>,
        next_follow_up -> Nullable<Timestamptz>,
        qualified_at -> Nullable<Timestamptz>,
        proposal_sent_at -> Nullable<Timestamptz>,
        negotiation_started_at -> Nullable<Timestamptz>,
        won_notes -> Nullable<Text>,
        lost_reason -> Nullable<Varchar>,
        lost_notes -> Nullable<Text>,
        closed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        last_stage_change_at -> Timestamptz,
        last_interaction_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
        version -> Int8,
    }
}

diesel::table! {
    /// Append-only deal activity log.
    deal_activities (id) {
        id -> Uuid,
        deal_id -> Uuid,
        kind -> Varchar,
        title -> Nullable<Varchar>,
        description -> Nullable<Text>,
        from_stage -> Nullable<Varchar>,
        to_stage -> Nullable<Varchar>,
        performed_by -> Uuid,
        performed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Scheduled follow-ups.
    deal_reminders (id) {
        id -> Uuid,
        deal_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        remind_at -> Timestamptz,
        assigned_to -> Uuid,
        created_by -> Uuid,
        created_at -> Timestamptz,
        /// One of `pending`, `completed`, `cancelled`.
        status -> Varchar,
        settled_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(deal_activities -> deals (deal_id));
diesel::joinable!(deal_reminders -> deals (deal_id));

diesel::allow_tables_to_appear_in_same_query!(deals, deal_activities, deal_reminders);
