use verbex::{Template, VerbEx};

fn main() {
    let url = VerbEx::new()
        .start_of_line(true)
        .then("http")
        .maybe("s")
        .then("://")
        .maybe("www.")
        .anything_but(" ")
        .end_of_line(true);
    assert!(url.test("https://www.google.com").unwrap());
    assert!(url.test("http://goo gle.com").unwrap() == false);
    println!("url pattern: {url}");

    // Capture groups and template replacement.
    let re = VerbEx::new()
        .begin_capture()
        .word()
        .end_capture()
        .unwrap()
        .then("!")
        .compile()
        .unwrap();
    let hay = "stop! go! wait!";
    for m in re.find_iter(hay) {
        println!("shout: {}", &hay[m.range()]);
    }
    assert_eq!(re.replace_all(hay, &Template::new("$1?")), "stop? go? wait?");

    // Forked chains never interfere.
    let base = VerbEx::new().then("cat");
    let plural = base.clone().then("s");
    assert!(base.test("cat").unwrap());
    assert!(plural.test("cat").unwrap() == false);
    assert!(plural.test("cats").unwrap());
}
