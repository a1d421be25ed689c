use criterion::{Criterion, criterion_group, criterion_main};
use html_plaintext::PlainTextConverter;
use std::hint::black_box;

fn email_body(rows: usize) -> String {
    let mut html = String::from(
        "<html><head><title>Receipt</title><style>td { padding: 2px }</style></head><body>\
         <h1>Thanks for your order</h1><p>Your items:</p><table>",
    );
    for i in 0..rows {
        html.push_str(&format!(
            "<tr><td>Item {i}</td><td><a href=\"https://example.com/p/{i}\">details</a></td></tr>"
        ));
    }
    html.push_str("</table><ul><li>Free returns</li><li>Fast shipping</li></ul></body></html>");
    html
}

fn bench_convert(c: &mut Criterion) {
    let converter = PlainTextConverter::new();
    let small = email_body(10);
    let large = email_body(1000);

    c.bench_function("convert_small_email", |b| {
        b.iter(|| converter.convert(black_box(&small)))
    });
    c.bench_function("convert_large_email", |b| {
        b.iter(|| converter.convert(black_box(&large)))
    });
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
