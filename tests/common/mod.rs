//! Shared helpers for integration tests: a scripted transport and a tiny
//! PDF writer for synthetic policy documents.

#![allow(dead_code)]

use futures::future::BoxFuture;
use policy_extract::{PolicyTransport, TransportError, TransportRequest, TransportResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transport that always answers with the same body and records requests.
pub struct FakeTransport {
    reply: Result<String, TransportError>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    pub fn replying(body: impl Into<String>) -> Self {
        Self {
            reply: Ok(body.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: TransportError) -> Self {
        Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.user_prompt.clone())
    }
}

impl PolicyTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map(|content| TransportResponse {
                content,
                prompt_tokens: 500,
                completion_tokens: 300,
            })
        })
    }
}

/// A well-formed model reply for a motor policy.
pub const MOTOR_POLICY_REPLY: &str = r#"{
  "Insurance_company_name": "Acme General Insurance Ltd",
  "Insurance_plan_name": "Private Car Package Policy",
  "Insurance_policy_type": "Comprehensive",
  "Insurance_policy_number": "3001/123456789/00/000",
  "Vehicle_registration_number": "MH01AB1234",
  "Engine_number": "K12MN1234567",
  "Chassis_number": "MA3EWDE1S00123456",
  "Policyholder_name": "Ravi Kumar",
  "Policyholder_address": "12 MG Road, Pune 411001",
  "Policyholder_phone_number": "9876543210",
  "Policyholder_emailid": "ravi@example.com",
  "Intermediary_code": "BR0001234",
  "Intermediary_name": "Safe Brokers Pvt Ltd",
  "Intermediary_phone_number": "02212345678",
  "Intermediary_emailid": "support@safebrokers.example",
  "Total_premium_paid": "14,160",
  "Own_damage_premium": "8,500",
  "Base_premium": "12,000",
  "Policy_start_date": "2024-05-01",
  "Policy_expiry_date": "30/04/2025",
  "Policy_issuance_date": "Apr 28, 2024"
}"#;

/// `count` words tagged with `tag`, e.g. `p1w0 p1w1 ...`.
pub fn words(tag: &str, count: usize) -> Vec<String> {
    (0..count).map(|n| format!("{tag}w{n}")).collect()
}

/// Build a minimal PDF with one page per entry; each page shows its words
/// ten to a line in Helvetica.
pub fn build_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    let n = pages.len();
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (i, page_words) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let mut stream = String::from("BT /F1 10 Tf 12 TL 40 760 Td\n");
        for line in page_words.chunks(10) {
            stream.push_str(&format!("({}) Tj T*\n", line.join(" ")));
        }
        stream.push_str("ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Write `bytes` to a temp file and keep it alive with the returned handle.
pub fn write_temp_pdf(bytes: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("create temp pdf");
    f.write_all(bytes).expect("write temp pdf");
    f.flush().expect("flush temp pdf");
    f
}

/// Route `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// True when a pdfium library can be bound in this environment.
pub fn pdfium_available() -> bool {
    match policy_extract::pipeline::pdf::bind_pdfium() {
        Ok(_) => true,
        Err(e) => {
            println!("SKIP — pdfium not available: {}", e.to_string().lines().next().unwrap_or(""));
            false
        }
    }
}
