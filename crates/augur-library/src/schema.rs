//! Reading store database schema.

/// SQL to create the readings table.
pub const CREATE_READINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS readings (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id     VARCHAR(255) NOT NULL,
    record_type VARCHAR(64) NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    payload     JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_readings_user_type_created
    ON readings (user_id, record_type, created_at DESC);
";
