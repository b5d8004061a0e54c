use crate::*;

// ============================================================================
//  SCALARS
// ============================================================================

#[test]
fn test_scalars_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.bool(true)?;
    enc.bool(false)?;
    enc.u8(255)?;
    enc.i8(-128)?;
    enc.u16(u16::MAX)?;
    enc.i16(i16::MIN)?;
    enc.u32(u32::MAX)?;
    enc.i32(i32::MIN)?;
    enc.u64(u64::MAX)?;
    enc.i64(i64::MIN)?;
    enc.f32(1.5)?;
    enc.f64(std::f64::consts::PI)?;
    enc.char('λ')?;
    enc.unit()?;
    enc.none()?;

    let bytes = enc.finish()?;
    let mut dec = Decoder::new(&bytes);

    assert!(dec.bool()?);
    assert!(!dec.bool()?);
    assert_eq!(dec.u8()?, 255);
    assert_eq!(dec.i8()?, -128);
    assert_eq!(dec.u16()?, u16::MAX);
    assert_eq!(dec.i16()?, i16::MIN);
    assert_eq!(dec.u32()?, u32::MAX);
    assert_eq!(dec.i32()?, i32::MIN);
    assert_eq!(dec.u64()?, u64::MAX);
    assert_eq!(dec.i64()?, i64::MIN);
    assert_eq!(dec.f32()?, 1.5);
    assert_eq!(dec.f64()?, std::f64::consts::PI);
    assert_eq!(dec.char()?, 'λ');
    dec.unit()?;
    assert!(dec.option()?.is_none());
    dec.finish()
}

#[test]
fn test_blobs_are_borrowed() -> Result<()> {
    let mut enc = Encoder::new();
    enc.str("hello")?;
    enc.bytes(&[1, 2, 3])?;
    enc.str("")?;

    let bytes = enc.finish()?;
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.str()?, "hello");
    assert_eq!(dec.bytes()?, &[1, 2, 3]);
    assert_eq!(dec.str()?, "");
    assert!(dec.is_empty());
    Ok(())
}

#[test]
fn test_wrong_tag_is_reported() -> Result<()> {
    let mut enc = Encoder::new();
    enc.u32(7)?;
    let bytes = enc.finish()?;

    let mut dec = Decoder::new(&bytes);
    assert_eq!(
        dec.i64(),
        Err(Error::UnexpectedTag { expected: Tag::I64, found: Tag::U32 })
    );
    // A failed read does not consume the item.
    assert_eq!(dec.u32()?, 7);
    Ok(())
}

#[test]
fn test_invalid_char_and_utf8() {
    let bytes = [Tag::Char as u8, 0x00, 0xD8, 0x00, 0x00];
    assert_eq!(Decoder::new(&bytes).char(), Err(Error::InvalidChar(0xD800)));

    let bytes = [Tag::String as u8, 2, 0, 0, 0, 0xC3, 0x28];
    assert_eq!(Decoder::new(&bytes).str(), Err(Error::InvalidUtf8));

    assert_eq!(Decoder::new(&[0x99]).peek_tag(), Err(Error::InvalidTag(0x99)));
}

// ============================================================================
//  CONTAINERS
// ============================================================================

#[test]
fn test_nested_containers() -> Result<()> {
    let mut enc = Encoder::new();
    enc.variant("point", |enc| {
        enc.map(|enc| {
            enc.variant("x", |enc| enc.i32(3))?;
            enc.variant("tags", |enc| {
                enc.list(|enc| {
                    enc.str("a")?;
                    enc.str("b")
                })
            })?;
            enc.variant("next", |enc| enc.some(|enc| enc.bool(true)))
        })
    })?;
    enc.ok(|enc| enc.u8(1))?;
    enc.err(|enc| enc.str("bad"))?;
    assert!(enc.at_root());

    let bytes = enc.finish()?;
    let mut dec = Decoder::new(&bytes);

    let (name, mut body) = dec.variant()?;
    assert_eq!(name, "point");
    let mut entries = body.map()?;
    body.finish()?;

    let (key, mut x) = entries.next().ok_or(Error::UnexpectedEnd)??;
    assert_eq!(key, "x");
    assert_eq!(x.i32()?, 3);

    let (key, mut tags) = entries.next().ok_or(Error::UnexpectedEnd)??;
    assert_eq!(key, "tags");
    let items = tags
        .list()?
        .map(|item| item.and_then(|mut d| d.str().map(str::to_owned)))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(items, vec!["a", "b"]);

    let (key, mut next) = entries.next().ok_or(Error::UnexpectedEnd)??;
    assert_eq!(key, "next");
    let mut inner = next.option()?.ok_or(Error::UnexpectedEnd)?;
    assert!(inner.bool()?);
    assert!(entries.next().is_none());

    match dec.result()? {
        Ok(mut d) => assert_eq!(d.u8()?, 1),
        Err(_) => panic!("expected ok"),
    }
    match dec.result()? {
        Err(mut d) => assert_eq!(d.str()?, "bad"),
        Ok(_) => panic!("expected err"),
    }
    dec.finish()
}

#[test]
fn test_empty_list_and_map() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list(|_| Ok(()))?;
    enc.map(|_| Ok(()))?;
    let bytes = enc.finish()?;

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.list()?.count(), 0);
    assert_eq!(dec.map()?.count(), 0);
    Ok(())
}

// ============================================================================
//  STRUCTURAL RULES
// ============================================================================

#[test]
fn test_map_only_accepts_variants() {
    let mut enc = Encoder::new();
    let res = enc.map(|enc| enc.u8(1));
    assert_eq!(res, Err(Error::InvalidMapEntry));
    assert_eq!(enc.finish(), Err(Error::ScopeStillOpen));
}

#[test]
fn test_adt_requires_exactly_one_item() {
    let mut enc = Encoder::new();
    assert_eq!(enc.some(|_| Ok(())), Err(Error::EmptyAdt(Scope::Option)));

    let mut enc = Encoder::new();
    let res = enc.variant("pair", |enc| {
        enc.u8(1)?;
        enc.u8(2)
    });
    assert_eq!(res, Err(Error::TooManyItems(Scope::Variant)));

    let mut enc = Encoder::new();
    let res = enc.ok(|enc| {
        enc.unit()?;
        enc.unit()
    });
    assert_eq!(res, Err(Error::TooManyItems(Scope::Result)));
}

#[test]
fn test_failed_closure_leaves_scope_open() {
    let mut enc = Encoder::new();
    let res = enc.list(|enc| {
        enc.u8(1)?;
        enc.map(|enc| enc.bool(true))
    });
    assert!(res.is_err());
    assert!(!enc.at_root());
    assert_eq!(enc.finish(), Err(Error::ScopeStillOpen));
}

// ============================================================================
//  FRAMING & SKIPPING
// ============================================================================

#[test]
fn test_header_parse_frames_a_variant() -> Result<()> {
    let mut enc = Encoder::new();
    enc.variant("call", |enc| enc.str("ping"))?;
    let bytes = enc.finish()?;

    let header = Header::parse(&bytes)?;
    assert_eq!(header.tag, Tag::Variant);
    assert_eq!(Header::SIZE + header.body_len(), bytes.len());
    Ok(())
}

#[test]
fn test_header_rejects_short_and_unframed() -> Result<()> {
    assert_eq!(Header::parse(&[Tag::List as u8, 0, 0]), Err(Error::UnexpectedEnd));

    let mut enc = Encoder::new();
    enc.u32(9)?;
    let bytes = enc.finish()?;
    assert_eq!(Header::parse(&bytes), Err(Error::Unframed(Tag::U32)));
    Ok(())
}

#[test]
fn test_skip_and_take_item() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list(|enc| {
        enc.list(|enc| enc.i64(1))?;
        enc.f64(2.0)
    })?;
    enc.str("after")?;
    let bytes = enc.finish()?;

    let mut dec = Decoder::new(&bytes);
    let mut item = dec.take_item()?;
    assert_eq!(item.peek_tag()?, Tag::List);
    item.skip()?;
    item.finish()?;
    assert_eq!(dec.str()?, "after");

    let mut dec = Decoder::new(&bytes);
    dec.skip()?;
    dec.skip()?;
    dec.finish()
}

#[test]
fn test_truncated_input() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list(|enc| {
        enc.u64(1)?;
        enc.u64(2)
    })?;
    let bytes = enc.finish()?;
    let cut = &bytes[..bytes.len() - 3];

    assert_eq!(Decoder::new(cut).list().err(), Some(Error::UnexpectedEnd));
    assert_eq!(Decoder::new(cut).skip(), Err(Error::UnexpectedEnd));

    let mut enc = Encoder::new();
    enc.u64(42)?;
    let bytes = enc.finish()?;
    assert_eq!(Decoder::new(&bytes[..3]).u64(), Err(Error::UnexpectedEnd));
    Ok(())
}

#[test]
fn test_malformed_list_item_stops_iteration() {
    // A list whose body claims a string longer than the body itself.
    let bytes = [Tag::List as u8, 5, 0, 0, 0, Tag::String as u8, 9, 0, 0, 0];
    let mut items = Decoder::new(&bytes).list().into_iter().flatten();
    assert_eq!(items.next().map(|r| r.err()), Some(Some(Error::UnexpectedEnd)));
    assert!(items.next().is_none());
}

#[test]
fn test_trailing_bytes() -> Result<()> {
    let mut enc = Encoder::new();
    enc.u8(1)?;
    enc.u8(2)?;
    let bytes = enc.finish()?;

    let mut dec = Decoder::new(&bytes);
    dec.u8()?;
    assert_eq!(dec.finish(), Err(Error::TrailingBytes(2)));
    Ok(())
}
