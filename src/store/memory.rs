//! In-memory stores for tests. The ledger keeps the one-open-record rule
//! under a single lock, mirroring the unique index in MySQL.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{AttendanceLedger, CredentialSource, FaceProfile, ShiftCatalog, StoreError};
use crate::model::attendance::{
    AttendanceRecord, ClockOutEntry, NewClockIn, RecordFilter, work_minutes,
};
use crate::model::employee::Employee;
use crate::model::shift::{NewShift, Shift};

fn matches(filter: &RecordFilter, record: &AttendanceRecord) -> bool {
    filter.employee_id.is_none_or(|id| record.employee_id == id)
        && filter.from.is_none_or(|from| record.clock_in_time >= from)
        && filter.to.is_none_or(|to| record.clock_in_time < to)
        && (!filter.open_only || record.is_open())
}

#[derive(Default)]
pub struct MemoryDirectory {
    employees: Mutex<Vec<Employee>>,
}

impl MemoryDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            employees: Mutex::new(employees),
        }
    }

    pub fn upsert(&self, employee: Employee) {
        let mut employees = self.employees.lock().unwrap();
        employees.retain(|e| e.id != employee.id);
        employees.push(employee);
    }

    fn find(&self, pred: impl Fn(&Employee) -> bool) -> Option<Employee> {
        let employees = self.employees.lock().unwrap();
        let mut hits: Vec<&Employee> = employees.iter().filter(|e| pred(e)).collect();
        hits.sort_by_key(|e| (!e.is_active(), e.id));
        hits.first().map(|e| (*e).clone())
    }
}

#[async_trait]
impl CredentialSource for MemoryDirectory {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.find(|e| e.id == id))
    }

    async fn find_by_code(&self, employee_code: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.find(|e| e.employee_code.eq_ignore_ascii_case(employee_code)))
    }

    async fn find_by_rfid(&self, rfid_card_id: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.find(|e| {
            e.rfid_card_id
                .as_deref()
                .is_some_and(|card| card.eq_ignore_ascii_case(rfid_card_id))
        }))
    }

    async fn find_by_fingerprint(&self, template: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.find(|e| e.fingerprint_template.as_deref() == Some(template)))
    }

    async fn active_face_profiles(&self) -> Result<Vec<FaceProfile>, StoreError> {
        let employees = self.employees.lock().unwrap();
        Ok(employees
            .iter()
            .filter(|e| e.is_active())
            .filter_map(|e| {
                e.face_encoding.as_ref().map(|encoding| FaceProfile {
                    employee_id: e.id,
                    encoding: encoding.clone(),
                })
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryShifts {
    shifts: Mutex<Vec<Shift>>,
}

impl MemoryShifts {
    pub fn new(shifts: Vec<Shift>) -> Self {
        Self {
            shifts: Mutex::new(shifts),
        }
    }
}

#[async_trait]
impl ShiftCatalog for MemoryShifts {
    async fn find_shift(&self, id: u64) -> Result<Option<Shift>, StoreError> {
        Ok(self.shifts.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>, StoreError> {
        let mut shifts: Vec<Shift> = self
            .shifts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.start_time);
        Ok(shifts)
    }

    async fn create_shift(&self, shift: &NewShift) -> Result<Shift, StoreError> {
        let mut shifts = self.shifts.lock().unwrap();
        let name = shift.name.trim();
        if shifts.iter().any(|s| s.name == name) {
            return Err(StoreError::Conflict);
        }
        let created = Shift {
            id: shifts.iter().map(|s| s.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            start_time: shift.start_time,
            end_time: shift.end_time,
            grace_period_minutes: shift.grace(),
            is_active: true,
        };
        shifts.push(created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryLedger {
    pub fn all(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn find_open_record(
        &self,
        employee_id: u64,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.employee_id == employee_id && r.is_open())
            .cloned())
    }

    async fn insert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.employee_id == entry.employee_id && r.is_open())
        {
            return Err(StoreError::Conflict);
        }

        let record = AttendanceRecord {
            id: records.len() as u64 + 1,
            employee_id: entry.employee_id,
            shift_id: entry.shift_id,
            clock_in_time: entry.clock_in_time,
            clock_in_method: entry.method,
            clock_in_location: entry.location,
            clock_in_photo: entry.photo_url,
            status: entry.status,
            minutes_late: entry.minutes_late,
            scheduled_start: entry.scheduled_start,
            scheduled_end: entry.scheduled_end,
            clock_out_time: None,
            clock_out_method: None,
            clock_out_location: None,
            clock_out_photo: None,
            notes: None,
            early_departure: false,
            work_duration_minutes: None,
            overtime_minutes: None,
            shift_completed: false,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn close_record(
        &self,
        record_id: u64,
        entry: ClockOutEntry,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id && r.is_open())
            .ok_or(StoreError::NotOpen)?;

        record.work_duration_minutes = Some(work_minutes(record.clock_in_time, entry.clock_out_time));
        record.clock_out_time = Some(entry.clock_out_time);
        record.clock_out_method = Some(entry.method);
        record.clock_out_location = entry.location;
        record.clock_out_photo = entry.photo_url;
        record.notes = entry.notes;
        record.early_departure = entry.early_departure;
        record.overtime_minutes = Some(entry.overtime_minutes);
        record.shift_completed = entry.shift_completed;
        Ok(record.clone())
    }

    async fn get_record(&self, record_id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == record_id)
            .cloned())
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut hits: Vec<AttendanceRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches(filter, r))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.clock_in_time.cmp(&a.clock_in_time).then(b.id.cmp(&a.id)));
        Ok(hits)
    }
}
