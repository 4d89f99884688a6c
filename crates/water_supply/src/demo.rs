//! A small, self-consistent London data set served by [`MemoryBackend`]
//! when no real api is configured.

use serde_json::json;

use crate::memory::{MemoryBackend, ResponseMode};

pub fn backend() -> MemoryBackend {
    MemoryBackend::new(ResponseMode::Envelope)
        .with_collection(
            "/locations",
            json!([
                {
                    "id": "LOC001",
                    "name": "Riverside Community Center",
                    "address": "123 Riverside Lane, London SW1A 1AA",
                    "coordinates": [51.5014, -0.1419],
                    "type": "community",
                    "status": "active",
                    "estimated_population": 2500,
                    "has_vulnerable_population": true
                },
                {
                    "id": "LOC002",
                    "name": "St Thomas' Hospital",
                    "address": "Westminster Bridge Rd, London SE1 7EH",
                    "coordinates": {"lat": 51.4988, "lng": -0.1186},
                    "type": "healthcare",
                    "status": "active",
                    "estimated_population": 1800,
                    "has_critical_equipment": true
                },
                {
                    "id": "LOC003",
                    "name": "Westminster City Hall",
                    "address": "64 Victoria Street, Westminster, London",
                    "latitude": 51.4975,
                    "longitude": -0.1357,
                    "type": "emergency",
                    "status": "active"
                },
                {
                    "id": "LOC004",
                    "name": "Borough Primary School",
                    "address": "Borough High Street, Southwark, London",
                    "coordinates": {"latitude": 51.5010, "longitude": -0.0922},
                    "type": "school",
                    "status": "active",
                    "estimated_population": 450,
                    "has_vulnerable_population": true
                },
                {
                    "id": "LOC005",
                    "name": "Greenwich Depot",
                    "address": "Park Row, Greenwich SE10 9NN",
                    "coordinates": [51.4826, -0.0077],
                    "type": "commercial",
                    "status": "planned"
                }
            ]),
        )
        .with_collection(
            "/bowsers",
            json!([
                {
                    "id": "BWR001", "number": "B-001", "capacity": 5000, "current_level": 4000,
                    "status": "deployed", "owner": "Thames Water", "manufacturer": "Aquatank",
                    "model": "AT-5000", "last_maintenance": "2025-02-10", "next_maintenance": "2025-05-10"
                },
                {
                    "id": "BWR002", "number": "B-002", "capacity": 7500, "current_level": 7000,
                    "status": "deployed", "owner": "Thames Water", "manufacturer": "Aquatank",
                    "model": "AT-7500", "last_maintenance": "2025-03-01", "next_maintenance": "2025-06-01"
                },
                {
                    "id": "BWR003", "number": "B-003", "capacity": 6000, "current_level": 900,
                    "status": "deployed", "owner": "Mutual Aid: Affinity Water",
                    "last_maintenance": "2025-01-20", "next_maintenance": "2025-04-20"
                },
                {
                    "id": "BWR004", "number": "B-004", "capacity": 5000, "current_level": 5000,
                    "status": "standby", "owner": "Thames Water"
                },
                {
                    "id": "BWR005", "number": "B-005", "capacity": 7500, "current_level": 0,
                    "status": "maintenance", "owner": "Thames Water"
                }
            ]),
        )
        .with_collection(
            "/deployments",
            json!([
                {
                    "id": "D1", "bowser_id": "BWR002", "location_id": "LOC001",
                    "status": "active", "start_date": "2025-04-01T08:00:00", "priority": "high"
                },
                {
                    "id": "D2", "bowser_id": "BWR001", "location_id": "LOC002",
                    "status": "scheduled", "start_date": "2025-04-14T07:30:00", "priority": "high"
                },
                {
                    "id": "D3", "bowser_id": "BWR003", "location_id": "LOC003",
                    "status": "active", "start_date": "2025-04-03T09:00:00", "priority": "medium"
                },
                {
                    "id": "D4", "bowser_id": "BWR004", "location_id": "LOC004",
                    "status": "completed", "start_date": "2025-03-20T09:00:00",
                    "end_date": "2025-03-27T17:00:00"
                }
            ]),
        )
        .with_collection(
            "/maintenance",
            json!([
                {
                    "id": "M1", "bowser_id": "BWR005", "maintenance_type": "repair",
                    "description": "Replace outlet valve", "date": "2025-04-11T10:00:00",
                    "priority": "high", "assigned_to": "J. Okafor", "status": "in_progress"
                },
                {
                    "id": "M2", "bowser_id": "BWR003", "maintenance_type": "inspection",
                    "description": "Quarterly hygiene inspection", "date": "2025-04-20T09:00:00",
                    "priority": "medium", "assigned_to": "S. Patel", "status": "scheduled"
                },
                {
                    "id": "M3", "bowser_id": "BWR004", "maintenance_type": "cleaning",
                    "description": "Tank disinfection after deployment", "date": "2025-03-28T09:00:00",
                    "priority": "low", "status": "completed"
                }
            ]),
        )
        .with_collection(
            "/alerts",
            json!([
                {
                    "id": "A1", "location_id": "LOC003", "title": "Low supply",
                    "message": "Bowser B-003 below 25% at Westminster City Hall",
                    "alert_type": "supply", "priority": "high", "created_at": "2025-04-10T14:05:00"
                },
                {
                    "id": "A2", "location_id": "LOC002", "title": "Deployment scheduled",
                    "message": "B-001 arrives at St Thomas' Hospital on Monday",
                    "alert_type": "deployment", "priority": "medium", "created_at": "2025-04-09T16:30:00"
                },
                {
                    "id": "A3", "title": "Boil water notice",
                    "message": "Boil water notice lifted for SE10",
                    "alert_type": "public", "priority": "low", "created_at": "2025-04-08T11:00:00",
                    "status": "resolved"
                }
            ]),
        )
        .with_collection(
            "/users",
            json!([
                {"id": "U1", "username": "dispatcher", "email": "dispatch@example.org", "role": "admin"},
                {"id": "U2", "username": "driver1", "role": "driver"}
            ]),
        )
        .with_collection(
            "/partners",
            json!([
                {"id": "P1", "name": "Affinity Water", "contact_email": "aid@affinity.example", "balance": -1250.0},
                {"id": "P2", "name": "Southern Water", "balance": 800.0},
                {"id": "P3", "name": "Anglian Water"}
            ]),
        )
        .with_collection(
            "/invoices",
            json!([
                {
                    "id": "I1", "invoice_number": "INV-2025-001", "client_name": "Westminster Council",
                    "deployment_id": "D1", "amount": 2400.0, "status": "paid",
                    "issue_date": "2025-04-02", "due_date": "2025-05-02"
                },
                {
                    "id": "I2", "invoice_number": "INV-2025-002", "client_name": "Guy's and St Thomas'",
                    "deployment_id": "D2", "amount": 1800.0, "status": "pending",
                    "issue_date": "2025-04-07", "due_date": "2025-05-07"
                },
                {
                    "id": "I3", "invoice_number": "INV-2025-003", "client_name": "Southwark Council",
                    "deployment_id": "D4", "amount": 950.0, "status": "overdue",
                    "issue_date": "2025-03-15", "due_date": "2025-04-01"
                }
            ]),
        )
        .with_collection(
            "/mutual-aid/transactions",
            json!([
                {
                    "id": "T1", "partner_id": "P1", "amount": -1250.0,
                    "description": "Loan of B-003", "transaction_type": "loan_in",
                    "date": "2025-04-03T09:00:00"
                }
            ]),
        )
}
