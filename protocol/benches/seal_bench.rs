// Sealing and fingerprint benchmarks for AlgoCred.
//
// Covers key derivation, sealing and unsealing a typical semester record,
// and fingerprinting a degree field list.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use algocred_protocol::fingerprint::{compute_fingerprint, degree_fields};
use algocred_protocol::grading::{aggregate, GradingPolicy};
use algocred_protocol::record::{CourseResult, CredentialRecord, SemesterRecord};
use algocred_protocol::seal::{derive_key, seal, unseal};

fn semester(courses: usize) -> SemesterRecord {
    SemesterRecord {
        seat_number: "2021-CS-01".into(),
        student_name: "A. Khan".into(),
        fathers_name: Some("M. Khan".into()),
        department: "Computer Science".into(),
        degree_title: "Bachelor of Science".into(),
        semester: "5".into(),
        courses: (0..courses)
            .map(|i| CourseResult::new(format!("Course {i}"), format!("CS3{i:02}"), 40.0 + i as f64))
            .collect(),
    }
}

fn bench_derive_key(c: &mut Criterion) {
    c.bench_function("seal/derive_key", |b| {
        b.iter(|| derive_key("2021-CS-01"));
    });
}

fn bench_seal_unseal(c: &mut Criterion) {
    let mut group = c.benchmark_group("seal/roundtrip");
    for courses in [2usize, 7, 20] {
        let rec = semester(courses);
        let len = serde_json::to_vec(&rec).map(|v| v.len()).unwrap_or(0);
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("seal", courses), &rec, |b, rec| {
            b.iter(|| seal(rec, "2021-CS-01").unwrap());
        });

        let sealed = seal(&rec, "2021-CS-01").unwrap();
        group.bench_with_input(BenchmarkId::new("unseal", courses), &sealed, |b, sealed| {
            b.iter(|| unseal::<SemesterRecord>(sealed, "2021-CS-01").unwrap());
        });
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let rec = CredentialRecord {
        student_name: "A. Khan".into(),
        institution: "Karachi University".into(),
        year: "2024".into(),
        degree_title: "Bachelor of Science".into(),
        seat_number: "2021-CS-01".into(),
        percentage: Some(78.5),
        courses: None,
    };
    c.bench_function("fingerprint/degree", |b| {
        b.iter(|| compute_fingerprint(&degree_fields(&rec)));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let rec = semester(20);
    let policy = GradingPolicy::strict();
    c.bench_function("grading/aggregate_20", |b| {
        b.iter(|| aggregate(&rec.courses, &policy).unwrap());
    });
}

criterion_group!(
    benches,
    bench_derive_key,
    bench_seal_unseal,
    bench_fingerprint,
    bench_aggregate
);
criterion_main!(benches);
