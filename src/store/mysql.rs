use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, MySqlPool, types::Json};
use std::str::FromStr;
use tracing::debug;

use super::{AttendanceLedger, CredentialSource, FaceProfile, ShiftCatalog, StoreError};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, AuthMethod, ClockOutEntry, NewClockIn, RecordFilter,
};
use crate::model::employee::{Employee, EmploymentStatus};
use crate::model::shift::{NewShift, Shift};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, full_name, department, position, status, \
     shift_id, rfid_card_id, pin_code, face_encoding, fingerprint_template";

// Plain equality: the `_ai_ci` column collation makes these case-insensitive
// and lets MySQL use uq_employees_code / idx_employees_rfid.
const BY_CODE: &str = "employee_code = ?";
const BY_RFID: &str = "rfid_card_id = ?";

const SHIFT_COLUMNS: &str = "id, name, start_time, end_time, grace_period_minutes, is_active";

const ATTENDANCE_COLUMNS: &str = "id, employee_id, shift_id, clock_in_time, clock_in_method, \
     clock_in_location, clock_in_photo, status, minutes_late, scheduled_start, scheduled_end, \
     clock_out_time, clock_out_method, clock_out_location, clock_out_photo, notes, \
     early_departure, work_duration_minutes, overtime_minutes, shift_completed";

/// MySQL-backed employees, shifts and attendance ledger sharing one pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_employee(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Option<Employee>, StoreError> {
        let sql = format!(
            "SELECT {} FROM employees WHERE {} ORDER BY (status = 'ACTIVE') DESC, id LIMIT 1",
            EMPLOYEE_COLUMNS, filter
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Employee::try_from).transpose()
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    employee_code: String,
    full_name: String,
    department: Option<String>,
    position: Option<String>,
    status: String,
    shift_id: u64,
    rfid_card_id: Option<String>,
    pin_code: Option<String>,
    face_encoding: Option<Json<Vec<f64>>>,
    fingerprint_template: Option<String>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            employee_code: row.employee_code,
            full_name: row.full_name,
            department: row.department,
            position: row.position,
            status: parse_column::<EmploymentStatus>("employees.status", &row.status)?,
            shift_id: row.shift_id,
            rfid_card_id: row.rfid_card_id,
            pin_code: row.pin_code,
            face_encoding: row.face_encoding.map(|Json(v)| v),
            fingerprint_template: row.fingerprint_template,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    shift_id: u64,
    clock_in_time: NaiveDateTime,
    clock_in_method: String,
    clock_in_location: Option<String>,
    clock_in_photo: Option<String>,
    status: String,
    minutes_late: u32,
    scheduled_start: NaiveDateTime,
    scheduled_end: NaiveDateTime,
    clock_out_time: Option<NaiveDateTime>,
    clock_out_method: Option<String>,
    clock_out_location: Option<String>,
    clock_out_photo: Option<String>,
    notes: Option<String>,
    early_departure: bool,
    work_duration_minutes: Option<u32>,
    overtime_minutes: Option<u32>,
    shift_completed: bool,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let clock_out_method = row
            .clock_out_method
            .as_deref()
            .map(|m| parse_column::<AuthMethod>("attendance.clock_out_method", m))
            .transpose()?;

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            shift_id: row.shift_id,
            clock_in_time: row.clock_in_time,
            clock_in_method: parse_column("attendance.clock_in_method", &row.clock_in_method)?,
            clock_in_location: row.clock_in_location,
            clock_in_photo: row.clock_in_photo,
            status: parse_column::<AttendanceStatus>("attendance.status", &row.status)?,
            minutes_late: row.minutes_late,
            scheduled_start: row.scheduled_start,
            scheduled_end: row.scheduled_end,
            clock_out_time: row.clock_out_time,
            clock_out_method,
            clock_out_location: row.clock_out_location,
            clock_out_photo: row.clock_out_photo,
            notes: row.notes,
            early_departure: row.early_departure,
            work_duration_minutes: row.work_duration_minutes,
            overtime_minutes: row.overtime_minutes,
            shift_completed: row.shift_completed,
        })
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse::<T>()
        .map_err(|_| StoreError::Corrupt(format!("{} has unexpected value {:?}", column, value)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.code().as_deref() == Some("23000")
        }
        _ => false,
    }
}

#[async_trait]
impl CredentialSource for MySqlStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Employee::try_from).transpose()
    }

    async fn find_by_code(&self, employee_code: &str) -> Result<Option<Employee>, StoreError> {
        self.fetch_employee(BY_CODE, employee_code).await
    }

    async fn find_by_rfid(&self, rfid_card_id: &str) -> Result<Option<Employee>, StoreError> {
        self.fetch_employee(BY_RFID, rfid_card_id).await
    }

    async fn find_by_fingerprint(&self, template: &str) -> Result<Option<Employee>, StoreError> {
        self.fetch_employee("fingerprint_template = ?", template)
            .await
    }

    async fn active_face_profiles(&self) -> Result<Vec<FaceProfile>, StoreError> {
        let rows = sqlx::query_as::<_, (u64, Json<Vec<f64>>)>(
            r#"
            SELECT id, face_encoding
            FROM employees
            WHERE status = 'ACTIVE'
            AND face_encoding IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(employee_id, Json(encoding))| FaceProfile {
                employee_id,
                encoding,
            })
            .collect())
    }
}

#[async_trait]
impl ShiftCatalog for MySqlStore {
    async fn find_shift(&self, id: u64) -> Result<Option<Shift>, StoreError> {
        let sql = format!("SELECT {} FROM shifts WHERE id = ?", SHIFT_COLUMNS);
        Ok(sqlx::query_as::<_, Shift>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>, StoreError> {
        let where_clause = if active_only { "WHERE is_active = TRUE" } else { "" };
        let sql = format!(
            "SELECT {} FROM shifts {} ORDER BY start_time ASC",
            SHIFT_COLUMNS, where_clause
        );
        Ok(sqlx::query_as::<_, Shift>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_shift(&self, shift: &NewShift) -> Result<Shift, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO shifts (name, start_time, end_time, grace_period_minutes)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(shift.name.trim())
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.grace())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })?;

        let id = result.last_insert_id();
        self.find_shift(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("shift {} vanished after insert", id)))
    }
}

#[async_trait]
impl AttendanceLedger for MySqlStore {
    async fn find_open_record(
        &self,
        employee_id: u64,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND clock_out_time IS NULL",
            ATTENDANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn insert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, StoreError> {
        // uq_attendance_one_open turns a racing second clock-in into a duplicate key.
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, shift_id, clock_in_time, clock_in_method, clock_in_location,
                 clock_in_photo, status, minutes_late, scheduled_start, scheduled_end)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.shift_id)
        .bind(entry.clock_in_time)
        .bind(entry.method.as_ref())
        .bind(entry.location.as_deref())
        .bind(entry.photo_url.as_deref())
        .bind(entry.status.as_ref())
        .bind(entry.minutes_late)
        .bind(entry.scheduled_start)
        .bind(entry.scheduled_end)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })?;

        let id = result.last_insert_id();
        self.get_record(id).await?.ok_or_else(|| {
            StoreError::Corrupt(format!("attendance {} vanished after insert", id))
        })
    }

    async fn close_record(
        &self,
        record_id: u64,
        entry: ClockOutEntry,
    ) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET clock_out_time = ?,
                clock_out_method = ?,
                clock_out_location = ?,
                clock_out_photo = ?,
                notes = ?,
                early_departure = ?,
                overtime_minutes = ?,
                shift_completed = ?,
                work_duration_minutes = GREATEST(0, TIMESTAMPDIFF(MINUTE, clock_in_time, ?))
            WHERE id = ?
            AND clock_out_time IS NULL
            "#,
        )
        .bind(entry.clock_out_time)
        .bind(entry.method.as_ref())
        .bind(entry.location.as_deref())
        .bind(entry.photo_url.as_deref())
        .bind(entry.notes.as_deref())
        .bind(entry.early_departure)
        .bind(entry.overtime_minutes)
        .bind(entry.shift_completed)
        .bind(entry.clock_out_time)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotOpen);
        }

        self.get_record(record_id).await?.ok_or(StoreError::NotOpen)
    }

    async fn get_record(&self, record_id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {} FROM attendance WHERE id = ?", ATTENDANCE_COLUMNS);
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        // Helper enum for typed binding
        enum FilterValue {
            U64(u64),
            DateTime(NaiveDateTime),
        }

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND clock_in_time >= ?");
            args.push(FilterValue::DateTime(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND clock_in_time < ?");
            args.push(FilterValue::DateTime(to));
        }
        if filter.open_only {
            where_sql.push_str(" AND clock_out_time IS NULL");
        }

        let sql = format!(
            "SELECT {} FROM attendance{} ORDER BY clock_in_time DESC, id DESC",
            ATTENDANCE_COLUMNS, where_sql
        );
        debug!(sql = %sql, ?filter, "Listing attendance records");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::DateTime(v) => query.bind(v),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }
}
